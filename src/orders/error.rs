//! Error types for the order service.

use crate::framework::StoreError;
use crate::model::{OrderId, ProductId};
use std::fmt::Display;
use thiserror::Error;

/// Why a status change was refused.
///
/// An unauthorized cancel is reported through the same error kind as an illegal transition, so
/// callers that only look at the kind see one "invalid transition" bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionRejection {
    /// The caller neither owns the order nor is an admin.
    NotAuthorized,
    /// Delivered orders are terminal.
    Delivered,
    /// Only pending orders can be cancelled by their owner.
    ShippedOrDelivered,
}

impl Display for TransitionRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransitionRejection::NotAuthorized => f.write_str("Not authorized"),
            TransitionRejection::Delivered => f.write_str("Delivered orders cannot be modified"),
            TransitionRejection::ShippedOrDelivered => {
                f.write_str("Cannot cancel shipped/delivered order")
            }
        }
    }
}

/// Errors that can occur during order operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum OrderError {
    #[error("Product not found")]
    ProductNotFound(ProductId),

    #[error("Not enough stock")]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    #[error("Order not found")]
    OrderNotFound(OrderId),

    #[error("Order already cancelled")]
    OrderAlreadyCancelled(OrderId),

    #[error("{0}")]
    InvalidOrderStatusTransition(TransitionRejection),

    #[error("Quantity must be greater than 0")]
    InvalidQuantity,

    /// Restoring stock would overflow the product's counter.
    #[error("Stock overflow on {0}")]
    StockOverflow(ProductId),

    #[error(transparent)]
    Store(#[from] StoreError),
}
