//! # Order Service
//!
//! The one place the stock and status rules live.
//!
//! ## Stock protocol
//!
//! Every path that moves stock locks the product row *before* reading `stock` and keeps the lock
//! until commit. Two `create_order` calls for the same product therefore run their
//! check-and-decrement one after the other, and the second sees what the first committed.
//!
//! Lock order is always order row, then product row. `create_order` only locks the product.
//!
//! ## Status machine
//!
//! ```text
//! pending ──► shipped ──► delivered
//!    │           │
//!    └───────────┴──────► cancelled
//! ```
//!
//! `update_status` refuses to touch `cancelled` (`OrderAlreadyCancelled`) and `delivered`
//! (`InvalidOrderStatusTransition`) orders. Between `pending` and `shipped` it accepts any target,
//! including `shipped -> pending`.
//!
//! ## Failure discipline
//!
//! Any error after the first store access rolls the transaction back before it is returned. Side
//! channels (product cache, event log) run only after a successful commit.

use super::entity::check_quantity;
use super::error::{OrderError, TransitionRejection};
use super::repository::OrderRepository;
use crate::auth::Principal;
use crate::events::{EventClient, Notice};
use crate::model::{NewOrder, Order, OrderId, OrderStatus, Product, ProductId, UserId};
use crate::products::{ProductCache, ProductError};
use tracing::{debug, info, warn};

pub struct OrderService<R: OrderRepository> {
    repo: R,
    cache: Option<ProductCache>,
    events: Option<EventClient>,
}

impl<R: OrderRepository> OrderService<R> {
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            cache: None,
            events: None,
        }
    }

    /// Cached products are dropped whenever an order moves their stock.
    pub fn with_cache(mut self, cache: ProductCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_events(mut self, events: EventClient) -> Self {
        self.events = Some(events);
        self
    }

    /// Reserves stock and creates a `pending` order, atomically.
    #[tracing::instrument(skip_all, fields(%user_id, %product_id, quantity))]
    pub async fn create_order(
        &mut self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Order, OrderError> {
        check_quantity(quantity)?;

        let result = self.try_create(user_id, product_id, quantity).await;
        match &result {
            Ok(order) => {
                info!(order_id = %order.id, "Order created");
                self.forget(product_id).await;
                self.notify(Notice::OrderCreated {
                    order_id: order.id,
                    user_id,
                    product_id,
                    quantity,
                });
            }
            Err(e) => self.abort(e),
        }
        result
    }

    async fn try_create(
        &mut self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Order, OrderError> {
        let mut product = self
            .repo
            .lock_product_for_update(product_id)
            .await?
            .ok_or(OrderError::ProductNotFound(product_id))?;

        product
            .reserve(quantity)
            .map_err(|e| stock_error(product_id, e))?;
        debug!(stock_left = product.stock, "Stock reserved");
        self.repo.save_product(product)?;

        let order = self
            .repo
            .create_order(NewOrder {
                user_id,
                product_id,
                quantity,
            })
            .await?;
        Ok(order)
    }

    /// Orders owned by `user_id`. Unlocked.
    pub async fn get_my_orders(&self, user_id: UserId) -> Result<Vec<Order>, OrderError> {
        Ok(self.repo.list_by_user(user_id).await?)
    }

    /// Every order. Access control is the caller's job.
    pub async fn get_all_orders(&self) -> Result<Vec<Order>, OrderError> {
        Ok(self.repo.list_all().await?)
    }

    /// Admin status change. Moving to `cancelled` puts the order's quantity back into stock.
    #[tracing::instrument(skip_all, fields(%order_id, %new_status))]
    pub async fn update_status(
        &mut self,
        order_id: OrderId,
        new_status: OrderStatus,
    ) -> Result<Order, OrderError> {
        let result = self.try_update_status(order_id, new_status).await;
        self.finish_status_change(&result).await;
        result
    }

    async fn try_update_status(
        &mut self,
        order_id: OrderId,
        new_status: OrderStatus,
    ) -> Result<Order, OrderError> {
        let mut order = self.lock_order(order_id).await?;
        match order.status() {
            OrderStatus::Cancelled => return Err(OrderError::OrderAlreadyCancelled(order_id)),
            OrderStatus::Delivered => {
                return Err(OrderError::InvalidOrderStatusTransition(
                    TransitionRejection::Delivered,
                ))
            }
            OrderStatus::Pending | OrderStatus::Shipped => {}
        }

        if new_status == OrderStatus::Cancelled {
            self.restore_stock(&order).await?;
        }
        order.set_status(new_status);
        self.repo.save_order(order.clone())?;
        self.repo.commit().await?;
        Ok(order)
    }

    /// Self-service cancel of a pending order. Admins may cancel any pending order.
    #[tracing::instrument(skip_all, fields(%order_id, principal = %principal.id))]
    pub async fn cancel_order(
        &mut self,
        order_id: OrderId,
        principal: &Principal,
    ) -> Result<Order, OrderError> {
        let result = self.try_cancel(order_id, principal).await;
        self.finish_status_change(&result).await;
        result
    }

    async fn try_cancel(
        &mut self,
        order_id: OrderId,
        principal: &Principal,
    ) -> Result<Order, OrderError> {
        let mut order = self.lock_order(order_id).await?;
        if !principal.can_act_for(order.user_id) {
            return Err(OrderError::InvalidOrderStatusTransition(
                TransitionRejection::NotAuthorized,
            ));
        }
        match order.status() {
            OrderStatus::Cancelled => return Err(OrderError::OrderAlreadyCancelled(order_id)),
            OrderStatus::Shipped | OrderStatus::Delivered => {
                return Err(OrderError::InvalidOrderStatusTransition(
                    TransitionRejection::ShippedOrDelivered,
                ))
            }
            OrderStatus::Pending => {}
        }

        self.restore_stock(&order).await?;
        order.set_status(OrderStatus::Cancelled);
        self.repo.save_order(order.clone())?;
        self.repo.commit().await?;
        Ok(order)
    }

    async fn lock_order(&mut self, order_id: OrderId) -> Result<Order, OrderError> {
        self.repo
            .lock_order_for_update(order_id)
            .await?
            .ok_or(OrderError::OrderNotFound(order_id))
    }

    /// Locks the order's product and stages `stock += quantity`.
    async fn restore_stock(&mut self, order: &Order) -> Result<Product, OrderError> {
        let mut product = self
            .repo
            .lock_product_for_update(order.product_id)
            .await?
            .ok_or(OrderError::ProductNotFound(order.product_id))?;
        product
            .restock(order.quantity())
            .map_err(|e| stock_error(order.product_id, e))?;
        debug!(product_id = %product.id, stock = product.stock, "Stock restored");
        self.repo.save_product(product.clone())?;
        Ok(product)
    }

    async fn finish_status_change(&mut self, result: &Result<Order, OrderError>) {
        match result {
            Ok(order) => {
                info!(order_id = %order.id, status = %order.status(), "Order status updated");
                if order.status() == OrderStatus::Cancelled {
                    self.forget(order.product_id).await;
                }
                self.notify(Notice::OrderStatusUpdated {
                    order_id: order.id,
                    status: order.status(),
                });
            }
            Err(e) => self.abort(e),
        }
    }

    fn abort(&mut self, error: &OrderError) {
        match error {
            OrderError::Store(e) if !e.is_retryable() => warn!(error = %e, "Order store failure"),
            e => warn!(error = %e, "Order operation rejected"),
        }
        self.repo.rollback();
    }

    fn notify(&self, notice: Notice) {
        if let Some(events) = &self.events {
            events.notify(notice);
        }
    }

    async fn forget(&self, product_id: ProductId) {
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.delete(product_id).await {
                warn!(%product_id, error = %e, "Cache invalidation failed");
            }
        }
    }
}

fn stock_error(product_id: ProductId, error: ProductError) -> OrderError {
    match error {
        ProductError::InsufficientStock {
            requested,
            available,
        } => OrderError::InsufficientStock {
            product_id,
            requested,
            available,
        },
        ProductError::Store(e) => OrderError::Store(e),
        _ => OrderError::StockOverflow(product_id),
    }
}
