//! The store handle and its options.

use super::session::Session;
use super::{Relation, Tables};
use std::fmt::Display;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::info;

/// What happens to orders when the user or product they reference is removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OnDelete {
    /// Referencing orders are deleted in the same transaction.
    #[default]
    Cascade,
    /// The delete fails while any order references the row.
    Restrict,
    /// Orders keep pointing at the missing row.
    Detach,
}

impl FromStr for OnDelete {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cascade" => Ok(OnDelete::Cascade),
            "restrict" => Ok(OnDelete::Restrict),
            "detach" => Ok(OnDelete::Detach),
            other => Err(format!("unknown on-delete policy: {other}")),
        }
    }
}

impl Display for OnDelete {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OnDelete::Cascade => f.write_str("cascade"),
            OnDelete::Restrict => f.write_str("restrict"),
            OnDelete::Detach => f.write_str("detach"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Upper bound on waiting for a single row lock.
    pub lock_timeout: Duration,
    pub on_user_delete: OnDelete,
    pub on_product_delete: OnDelete,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_secs(5),
            on_user_delete: OnDelete::Cascade,
            on_product_delete: OnDelete::Cascade,
        }
    }
}

pub(crate) struct Inner {
    pub(crate) tables: RwLock<Tables>,
    pub(crate) options: StoreOptions,
    closed: AtomicBool,
}

impl Inner {
    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Cloneable handle to one store. Clones share the same data.
#[derive(Clone)]
pub struct Store {
    pub(crate) inner: Arc<Inner>,
}

impl Store {
    /// Opens an empty store.
    pub fn open(options: StoreOptions) -> Self {
        info!(
            lock_timeout_ms = options.lock_timeout.as_millis() as u64,
            on_user_delete = %options.on_user_delete,
            on_product_delete = %options.on_product_delete,
            "Store opened"
        );
        Self {
            inner: Arc::new(Inner {
                tables: RwLock::new(Tables::default()),
                options,
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Starts a new session with an empty transaction.
    pub fn session(&self) -> Session {
        Session::new(self.clone())
    }

    pub fn options(&self) -> &StoreOptions {
        &self.inner.options
    }

    /// Closes the store. Open sessions fail on their next operation and roll back.
    pub fn shutdown(&self) {
        if !self.inner.closed.swap(true, Ordering::SeqCst) {
            info!("Store closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    /// Number of committed rows in one relation.
    pub async fn row_count<T: Relation>(&self) -> usize {
        T::table(&*self.inner.tables.read().await).len()
    }
}
