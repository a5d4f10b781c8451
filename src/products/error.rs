//! Error types for the product catalog.

use crate::framework::StoreError;
use crate::model::ProductId;
use thiserror::Error;

/// Errors that can occur during product operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProductError {
    /// The product does not exist, or is soft-deleted and the lookup excludes deleted rows.
    #[error("Product not found")]
    NotFound(ProductId),

    /// Restore was called on a product that is not soft-deleted.
    #[error("Product is not deleted")]
    NotDeleted(ProductId),

    /// A field is outside its allowed range.
    #[error("Invalid product: {0}")]
    Validation(String),

    /// The requested quantity exceeds the available stock.
    #[error("Not enough stock: requested {requested}, available {available}")]
    InsufficientStock { requested: u32, available: u32 },

    /// Restoring stock would exceed the counter's range.
    #[error("Stock overflow: {stock} + {quantity}")]
    StockOverflow { stock: u32, quantity: u32 },

    #[error(transparent)]
    Store(#[from] StoreError),
}
