//! Generic storage building blocks.
//!
//! This module provides the pieces the concrete store in [`crate::db`] is assembled from.
//!
//! # Main Components
//!
//! - [`Entity`] - Trait that record types implement to be stored
//! - [`Table`] - Committed rows of one relation, one lock per row
//! - [`Staged`] - The locks and pending writes of one open transaction on one relation
//! - [`StoreError`] - Failures of the store itself

pub mod entity;
pub mod error;
pub mod staging;
pub mod table;

// Re-export core types for convenience
pub use entity::Entity;
pub use error::StoreError;
pub use staging::{Staged, Write};
pub use table::{RowLock, Table};
