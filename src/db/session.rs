//! # Sessions
//!
//! A `Session` is one caller's unit of work against the [`Store`]. It always has exactly one open
//! transaction: locks and writes accumulate until [`Session::commit`] or [`Session::rollback`], after
//! which the session starts over with an empty transaction. Dropping a session rolls it back.
//!
//! ## Locking
//!
//! [`Session::lock`] waits for the exclusive lock of one row, bounded by
//! [`StoreOptions::lock_timeout`](super::StoreOptions::lock_timeout). Only locked (or self-inserted)
//! rows accept [`Session::update`] and deletes. Plain reads ([`Session::get`], [`Session::scan`])
//! never wait for row locks and may observe a value that is about to change.
//!
//! ## Commit
//!
//! Commit takes the store-wide write latch only for the instant it takes to check constraints and
//! copy the write set into the tables, then releases every row lock. Readers therefore see either
//! all of a transaction's writes or none of them.

use super::store::{OnDelete, Store};
use super::{Pending, Relation, Tables};
use crate::framework::{RowLock, StoreError, Write};
use crate::model::{Order, Product, ProductId, User, UserId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, trace, warn};

pub struct Session {
    store: Store,
    pending: Pending,
}

impl Session {
    pub(crate) fn new(store: Store) -> Self {
        Self {
            store,
            pending: Pending::default(),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.store.is_closed() {
            Err(StoreError::Closed)
        } else {
            Ok(())
        }
    }

    /// Locked read: acquires the exclusive lock of a row and returns its current value.
    ///
    /// Returns `Ok(None)` when the row does not exist (or disappeared while waiting).
    /// Locking a row this session already owns returns immediately.
    pub async fn lock<T: Relation>(&mut self, id: T::Id) -> Result<Option<T>, StoreError> {
        self.ensure_open()?;
        if T::staged(&self.pending).owns(&id) {
            return self.get(id).await;
        }
        let Some(row_lock) = self.row_lock::<T>(id).await else {
            return Ok(None);
        };

        trace!(table = T::TABLE, %id, "Waiting for row lock");
        let guard = tokio::time::timeout(self.store.options().lock_timeout, row_lock.lock_owned())
            .await
            .map_err(|_| {
                warn!(table = T::TABLE, %id, "Lock wait timeout");
                StoreError::LockTimeout {
                    table: T::TABLE,
                    id: id.to_string(),
                }
            })?;
        self.hold(id, guard).await
    }

    /// Like [`Session::lock`], but fails with [`StoreError::RowBusy`] instead of waiting when
    /// another session holds the row.
    pub async fn try_lock<T: Relation>(&mut self, id: T::Id) -> Result<Option<T>, StoreError> {
        self.ensure_open()?;
        if T::staged(&self.pending).owns(&id) {
            return self.get(id).await;
        }
        let Some(row_lock) = self.row_lock::<T>(id).await else {
            return Ok(None);
        };

        let guard = row_lock.try_lock_owned().map_err(|_| {
            debug!(table = T::TABLE, %id, "Row busy");
            StoreError::RowBusy {
                table: T::TABLE,
                id: id.to_string(),
            }
        })?;
        self.hold(id, guard).await
    }

    async fn row_lock<T: Relation>(&self, id: T::Id) -> Option<RowLock> {
        let tables = self.store.inner.tables.read().await;
        T::table(&tables).row_lock(&id)
    }

    async fn hold<T: Relation>(
        &mut self,
        id: T::Id,
        guard: OwnedMutexGuard<()>,
    ) -> Result<Option<T>, StoreError> {
        self.ensure_open()?;
        let current = T::table(&*self.store.inner.tables.read().await).get(&id).cloned();
        match current {
            Some(row) => {
                T::staged_mut(&mut self.pending).hold(id, guard);
                trace!(table = T::TABLE, %id, "Row locked");
                Ok(Some(row))
            }
            None => Ok(None),
        }
    }

    /// Unlocked read of one row, including this session's own pending writes.
    pub async fn get<T: Relation>(&self, id: T::Id) -> Result<Option<T>, StoreError> {
        self.ensure_open()?;
        let tables = self.store.inner.tables.read().await;
        Ok(T::staged(&self.pending).view(&id, T::table(&tables).get(&id)))
    }

    /// Unlocked read of every row matching `filter`, in ascending id order.
    pub async fn scan<T: Relation>(&self, filter: impl Fn(&T) -> bool) -> Result<Vec<T>, StoreError> {
        self.ensure_open()?;
        let tables = self.store.inner.tables.read().await;
        Ok(T::staged(&self.pending).scan(T::table(&tables).iter(), filter))
    }

    /// Allocates an id for a row about to be inserted.
    pub async fn next_id<T: Relation>(&self) -> Result<T::Id, StoreError> {
        self.ensure_open()?;
        Ok(T::table(&*self.store.inner.tables.read().await).allocate_id())
    }

    /// Stages an insert. The new row is owned by this session until commit.
    pub fn insert<T: Relation>(&mut self, row: T) -> Result<(), StoreError> {
        self.ensure_open()?;
        debug!(table = T::TABLE, id = %row.id(), "Insert staged");
        T::staged_mut(&mut self.pending).insert(row);
        Ok(())
    }

    /// Stages a new value for a row this session has locked.
    pub fn update<T: Relation>(&mut self, row: T) -> Result<(), StoreError> {
        self.ensure_open()?;
        T::staged_mut(&mut self.pending).update(row)
    }

    /// Deletes a user row, applying the configured policy to the user's orders.
    ///
    /// Returns `false` when the user does not exist.
    pub async fn delete_user(&mut self, id: UserId) -> Result<bool, StoreError> {
        let policy = self.store.options().on_user_delete;
        self.delete_referenced::<User>(id, policy, move |order| order.user_id == id)
            .await
    }

    /// Hard-deletes a product row, applying the configured policy to orders of that product.
    ///
    /// Returns `false` when the product does not exist.
    pub async fn delete_product(&mut self, id: ProductId) -> Result<bool, StoreError> {
        let policy = self.store.options().on_product_delete;
        self.delete_referenced::<Product>(id, policy, move |order| order.product_id == id)
            .await
    }

    // Dependent orders are locked before the parent row, the same order the order service uses
    // (order, then product), so the two never wait on each other in a cycle.
    async fn delete_referenced<T: Relation>(
        &mut self,
        id: T::Id,
        policy: OnDelete,
        references: impl Fn(&Order) -> bool,
    ) -> Result<bool, StoreError> {
        let mut dependents = self.scan::<Order>(&references).await?;
        if policy == OnDelete::Cascade {
            for order in &dependents {
                self.lock::<Order>(order.id).await?;
            }
        }

        if self.lock::<T>(id).await?.is_none() {
            return Ok(false);
        }

        // Orders committed between the scan and the parent lock. Waiting for them now would take
        // an order lock after the parent, so they are only taken if free.
        dependents = self.scan::<Order>(&references).await?;
        match policy {
            OnDelete::Restrict if !dependents.is_empty() => {
                return Err(StoreError::ForeignKeyViolation {
                    table: T::TABLE,
                    id: id.to_string(),
                    detail: format!("{} order(s) still reference it", dependents.len()),
                });
            }
            OnDelete::Cascade => {
                for order in dependents {
                    if self.try_lock::<Order>(order.id).await?.is_some() {
                        self.pending.orders.delete(order.id)?;
                    }
                }
            }
            _ => {}
        }

        T::staged_mut(&mut self.pending).delete(id)?;
        debug!(table = T::TABLE, %id, %policy, "Delete staged");
        Ok(true)
    }

    /// Makes every staged write visible at once and releases all row locks.
    ///
    /// A failing commit (closed store, broken constraint) rolls the transaction back.
    pub async fn commit(&mut self) -> Result<(), StoreError> {
        if let Err(e) = self.ensure_open() {
            self.rollback();
            return Err(e);
        }

        let inner = Arc::clone(&self.store.inner);
        let mut tables = inner.tables.write().await;
        if let Err(e) = self.check_constraints(&tables) {
            drop(tables);
            warn!(error = %e, "Commit rejected");
            self.rollback();
            return Err(e);
        }

        let dirty = self.pending.is_dirty();
        let users = self.pending.users.take_writes();
        let products = self.pending.products.take_writes();
        let orders = self.pending.orders.take_writes();
        let written = users.len() + products.len() + orders.len();
        tables.users.apply(users);
        tables.products.apply(products);
        tables.orders.apply(orders);
        drop(tables);

        let released = self.pending.release_all();
        if dirty || released > 0 {
            debug!(written, released, "Committed");
        }
        Ok(())
    }

    /// Discards every staged write and releases all row locks.
    pub fn rollback(&mut self) {
        let dirty = self.pending.is_dirty();
        let released = self.pending.release_all();
        if dirty || released > 0 {
            debug!(released, "Rolled back");
        }
    }

    fn check_constraints(&self, tables: &Tables) -> Result<(), StoreError> {
        if self.pending.users.is_dirty() {
            self.check_unique_email(tables)?;
        }
        if self.pending.orders.is_dirty() {
            self.check_order_references(tables)?;
        }
        self.check_deleted_parents::<User>(tables, self.store.options().on_user_delete, |o| o.user_id)?;
        self.check_deleted_parents::<Product>(tables, self.store.options().on_product_delete, |o| {
            o.product_id
        })?;
        Ok(())
    }

    fn exists<T: Relation>(&self, tables: &Tables, id: T::Id) -> bool {
        T::staged(&self.pending)
            .view(&id, T::table(tables).get(&id))
            .is_some()
    }

    fn check_unique_email(&self, tables: &Tables) -> Result<(), StoreError> {
        let users = self.pending.users.scan(tables.users.iter(), |_| true);
        let mut seen: HashMap<&str, UserId> = HashMap::with_capacity(users.len());
        for user in &users {
            if seen.insert(user.email.as_str(), user.id).is_some() {
                return Err(StoreError::UniqueViolation {
                    table: "users",
                    column: "email",
                    value: user.email.clone(),
                });
            }
        }
        Ok(())
    }

    fn check_order_references(&self, tables: &Tables) -> Result<(), StoreError> {
        for (id, write) in self.pending.orders.writes() {
            // References never change after insert.
            let Write::Insert(order) = write else {
                continue;
            };
            if !self.exists::<User>(tables, order.user_id) {
                return Err(StoreError::ForeignKeyViolation {
                    table: "orders",
                    id: id.to_string(),
                    detail: format!("{} does not exist", order.user_id),
                });
            }
            if !self.exists::<Product>(tables, order.product_id) {
                return Err(StoreError::ForeignKeyViolation {
                    table: "orders",
                    id: id.to_string(),
                    detail: format!("{} does not exist", order.product_id),
                });
            }
        }
        Ok(())
    }

    fn check_deleted_parents<T: Relation>(
        &self,
        tables: &Tables,
        policy: OnDelete,
        parent_of: impl Fn(&Order) -> T::Id,
    ) -> Result<(), StoreError> {
        if policy == OnDelete::Detach {
            return Ok(());
        }
        let deleted: Vec<T::Id> = T::staged(&self.pending)
            .writes()
            .filter(|(_, write)| matches!(write, Write::Delete))
            .map(|(id, _)| *id)
            .collect();
        if deleted.is_empty() {
            return Ok(());
        }
        let orders = self.pending.orders.scan(tables.orders.iter(), |order| {
            deleted.contains(&parent_of(order))
        });
        match orders.first() {
            Some(order) => Err(StoreError::ForeignKeyViolation {
                table: T::TABLE,
                id: parent_of(order).to_string(),
                detail: format!("{} still references it", order.id),
            }),
            None => Ok(()),
        }
    }
}
