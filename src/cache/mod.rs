//! # Product Cache
//!
//! A best-effort, TTL-bound key/value cache run as an actor.
//!
//! The [`CacheActor`] owns the map and processes requests sequentially in its own task, so no lock
//! guards the entries. Callers talk to it through the cloneable [`CacheClient`].
//!
//! ## Fills after invalidation
//!
//! A reader that misses, loads from the store and then writes back can lose a race with a writer
//! that commits and invalidates in between: the write-back would park the old value until the TTL
//! runs out. A miss therefore hands out a [`Ticket`], and [`CacheClient::fill`] only stores the
//! value if no delete happened since the ticket was issued.
//!
//! The actor stops when every client is dropped or when its stop signal turns `true`, whichever
//! comes first. Requests already queued are still answered.
//!
//! The cache is a side channel: a failed request ([`CacheError`]) means "ask the store", never
//! "fail the caller". Services log the failure at `warn!` and carry on.

use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;
use tracing::{debug, info};

/// Errors talking to the cache actor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    #[error("Cache actor closed")]
    ActorClosed,
    #[error("Cache actor dropped response channel")]
    ActorDropped,
}

/// Proof of a miss, stamped with the invalidation epoch at the time of the lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<V> {
    Hit(V),
    Miss(Ticket),
}

#[derive(Debug)]
pub enum CacheRequest<K, V> {
    Lookup {
        key: K,
        respond_to: oneshot::Sender<Lookup<V>>,
    },
    Fill {
        key: K,
        value: V,
        ticket: Ticket,
        respond_to: oneshot::Sender<bool>,
    },
    Delete {
        key: K,
        respond_to: oneshot::Sender<bool>,
    },
}

/// The server half: owns the entries and the receiving end of the channel.
pub struct CacheActor<K, V> {
    receiver: mpsc::Receiver<CacheRequest<K, V>>,
    entries: HashMap<K, (V, Instant)>,
    ttl: Duration,
    /// Bumped by every delete.
    epoch: u64,
}

impl<K, V> CacheActor<K, V>
where
    K: Eq + Hash + Display + Send + 'static,
    V: Clone + Send + 'static,
{
    pub fn new(buffer_size: usize, ttl: Duration) -> (Self, CacheClient<K, V>) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let actor = Self {
            receiver,
            entries: HashMap::new(),
            ttl,
            epoch: 0,
        };
        (actor, CacheClient { sender })
    }

    /// Processes requests until every client is dropped or `stop` turns `true`.
    pub async fn run(mut self, mut stop: watch::Receiver<bool>) {
        info!(ttl_secs = self.ttl.as_secs(), "Cache started");
        let mut stopping = false;

        loop {
            tokio::select! {
                msg = self.receiver.recv() => match msg {
                    Some(msg) => self.handle(msg),
                    None => break,
                },
                Ok(()) = stop.changed(), if !stopping => {
                    let stop_now = *stop.borrow_and_update();
                    if stop_now {
                        stopping = true;
                        self.receiver.close();
                        debug!("Cache stopping");
                    }
                }
            }
        }

        info!(size = self.entries.len(), "Cache shutdown");
    }

    fn handle(&mut self, msg: CacheRequest<K, V>) {
        match msg {
            CacheRequest::Lookup { key, respond_to } => {
                let now = Instant::now();
                let hit = match self.entries.get(&key) {
                    Some((value, expires_at)) if *expires_at > now => Some(value.clone()),
                    Some(_) => {
                        self.entries.remove(&key);
                        None
                    }
                    None => None,
                };
                debug!(%key, hit = hit.is_some(), "Cache lookup");
                let _ = respond_to.send(match hit {
                    Some(value) => Lookup::Hit(value),
                    None => Lookup::Miss(Ticket(self.epoch)),
                });
            }
            CacheRequest::Fill {
                key,
                value,
                ticket,
                respond_to,
            } => {
                let fresh = ticket.0 == self.epoch;
                if fresh {
                    debug!(%key, ttl_secs = self.ttl.as_secs(), "Cache fill");
                    self.entries.insert(key, (value, Instant::now() + self.ttl));
                } else {
                    debug!(%key, "Cache fill skipped, invalidated since lookup");
                }
                let _ = respond_to.send(fresh);
            }
            CacheRequest::Delete { key, respond_to } => {
                let removed = self.entries.remove(&key).is_some();
                self.epoch += 1;
                debug!(%key, removed, "Cache delete");
                let _ = respond_to.send(removed);
            }
        }
    }
}

/// The client half. Cheap to clone.
#[derive(Debug)]
pub struct CacheClient<K, V> {
    sender: mpsc::Sender<CacheRequest<K, V>>,
}

impl<K, V> Clone for CacheClient<K, V> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<K, V> CacheClient<K, V> {
    /// A hit, or a miss carrying the ticket for a later [`CacheClient::fill`].
    pub async fn lookup(&self, key: K) -> Result<Lookup<V>, CacheError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(CacheRequest::Lookup { key, respond_to })
            .await
            .map_err(|_| CacheError::ActorClosed)?;
        response.await.map_err(|_| CacheError::ActorDropped)
    }

    /// Stores `value` unless the cache was invalidated after `ticket` was issued. Returns whether
    /// the value was stored.
    pub async fn fill(&self, key: K, value: V, ticket: Ticket) -> Result<bool, CacheError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(CacheRequest::Fill {
                key,
                value,
                ticket,
                respond_to,
            })
            .await
            .map_err(|_| CacheError::ActorClosed)?;
        response.await.map_err(|_| CacheError::ActorDropped)
    }

    /// Removes one entry. Returns whether it was present.
    pub async fn delete(&self, key: K) -> Result<bool, CacheError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(CacheRequest::Delete { key, respond_to })
            .await
            .map_err(|_| CacheError::ActorClosed)?;
        response.await.map_err(|_| CacheError::ActorDropped)
    }
}
