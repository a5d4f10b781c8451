//! # Order Repository
//!
//! The data-access contract the [`OrderService`](super::OrderService) is written against, and its
//! store-backed implementation.
//!
//! Locked reads (`lock_*_for_update`) hold the row until the surrounding transaction ends; the
//! service decides when that is through [`OrderRepository::commit`] and
//! [`OrderRepository::rollback`]. [`OrderRepository::create_order`] commits on its own, which makes
//! "lock product, decrement, insert order" one atomic unit.

use super::error::OrderError;
use crate::db::Session;
use crate::framework::{Entity, StoreError};
use crate::model::{NewOrder, Order, OrderId, Product, ProductId, UserId};
use async_trait::async_trait;

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Locks the product row, deleted or not.
    async fn lock_product_for_update(&mut self, id: ProductId) -> Result<Option<Product>, StoreError>;

    async fn lock_order_for_update(&mut self, id: OrderId) -> Result<Option<Order>, StoreError>;

    /// Stages a new value for a locked product.
    fn save_product(&mut self, product: Product) -> Result<(), StoreError>;

    /// Stages a new value for a locked order.
    fn save_order(&mut self, order: Order) -> Result<(), StoreError>;

    /// Inserts a `pending` order and commits the surrounding transaction.
    async fn create_order(&mut self, order: NewOrder) -> Result<Order, OrderError>;

    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Order>, StoreError>;

    async fn list_all(&self) -> Result<Vec<Order>, StoreError>;

    async fn commit(&mut self) -> Result<(), StoreError>;

    fn rollback(&mut self);
}

/// [`OrderRepository`] over one store session.
pub struct StoreOrderRepository {
    session: Session,
}

impl StoreOrderRepository {
    pub fn new(session: Session) -> Self {
        Self { session }
    }
}

#[async_trait]
impl OrderRepository for StoreOrderRepository {
    async fn lock_product_for_update(&mut self, id: ProductId) -> Result<Option<Product>, StoreError> {
        self.session.lock::<Product>(id).await
    }

    async fn lock_order_for_update(&mut self, id: OrderId) -> Result<Option<Order>, StoreError> {
        self.session.lock::<Order>(id).await
    }

    fn save_product(&mut self, product: Product) -> Result<(), StoreError> {
        self.session.update(product)
    }

    fn save_order(&mut self, order: Order) -> Result<(), StoreError> {
        self.session.update(order)
    }

    async fn create_order(&mut self, params: NewOrder) -> Result<Order, OrderError> {
        let id = self.session.next_id::<Order>().await?;
        let order = Order::from_create_params(id, params)?;
        self.session.insert(order.clone())?;
        self.session.commit().await?;
        Ok(order)
    }

    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Order>, StoreError> {
        self.session.scan::<Order>(|o| o.user_id == user_id).await
    }

    async fn list_all(&self) -> Result<Vec<Order>, StoreError> {
        self.session.scan::<Order>(|_| true).await
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        self.session.commit().await
    }

    fn rollback(&mut self) {
        self.session.rollback();
    }
}
