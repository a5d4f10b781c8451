use crate::auth::{PasswordError, PasswordHasher, TokenIssuer};
use crate::cache::CacheActor;
use crate::config::{Config, ConfigError};
use crate::db::Store;
use crate::events::{EventActor, EventClient};
use crate::orders::{OrderService, StoreOrderRepository};
use crate::products::{ProductCache, ProductRepository, ProductService};
use crate::users::{UserRepository, UserService};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};

#[derive(Debug, thiserror::Error)]
pub enum DeskError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Password(#[from] PasswordError),
    #[error("Actor task failed: {0}")]
    ActorFailed(String),
}

/// The running application: one store, its side-channel actors and the shared identity services.
///
/// # Example
///
/// ```ignore
/// let desk = OrderDesk::start(Config::from_env()?)?;
///
/// let product = desk.products().create_product(params).await?;
/// let order = desk.orders().create_order(user_id, product.id, 2).await?;
///
/// desk.shutdown().await?;
/// ```
pub struct OrderDesk {
    config: Config,
    store: Store,
    cache: ProductCache,
    events: EventClient,
    hasher: Arc<PasswordHasher>,
    tokens: Arc<TokenIssuer>,
    stop: watch::Sender<bool>,
    handles: Vec<tokio::task::JoinHandle<()>>,
}

impl OrderDesk {
    /// Opens the store and starts the cache and event actors. Must be called inside a Tokio runtime.
    pub fn start(config: Config) -> Result<Self, DeskError> {
        let hasher = PasswordHasher::new(
            config.password_hash_memory_kib,
            config.password_hash_iterations,
        )?;
        let tokens = TokenIssuer::new(&config.jwt_secret, config.access_token_ttl()?);
        let store = Store::open(config.store_options());

        let (stop, _) = watch::channel(false);
        let (cache_actor, cache) = CacheActor::new(config.channel_buffer, config.cache_ttl);
        let (event_actor, events) = EventActor::new(config.channel_buffer);
        let cache_handle = tokio::spawn(cache_actor.run(stop.subscribe()));
        let event_stop = stop.subscribe();
        let event_handle = tokio::spawn(async move {
            event_actor.run(event_stop).await;
        });

        info!(environment = %config.environment, "Order desk started");
        Ok(Self {
            config,
            store,
            cache,
            events,
            hasher: Arc::new(hasher),
            tokens: Arc::new(tokens),
            stop,
            handles: vec![cache_handle, event_handle],
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// An order service on a fresh session.
    pub fn orders(&self) -> OrderService<StoreOrderRepository> {
        OrderService::new(StoreOrderRepository::new(self.store.session()))
            .with_cache(self.cache.clone())
            .with_events(self.events.clone())
    }

    /// A product service on a fresh session.
    pub fn products(&self) -> ProductService {
        ProductService::new(ProductRepository::new(self.store.session())).with_cache(self.cache.clone())
    }

    /// A user service on a fresh session.
    pub fn users(&self) -> UserService {
        UserService::new(
            UserRepository::new(self.store.session()),
            Arc::clone(&self.hasher),
            Arc::clone(&self.tokens),
        )
        .with_events(self.events.clone())
    }

    /// Closes the store, signals the actors to stop and waits for them to drain.
    ///
    /// Services handed out earlier may still be alive: their store calls fail with
    /// [`StoreError::Closed`](crate::framework::StoreError::Closed), and their cache and event
    /// requests are dropped.
    pub async fn shutdown(self) -> Result<(), DeskError> {
        info!("Shutting down order desk...");
        self.store.shutdown();
        self.stop.send_replace(true);

        for handle in self.handles {
            if let Err(e) = handle.await {
                error!(error = ?e, "Actor task failed");
                return Err(DeskError::ActorFailed(e.to_string()));
            }
        }

        info!("Order desk shutdown complete.");
        Ok(())
    }
}
