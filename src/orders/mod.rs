//! Orders: the repository contract, its store-backed implementation and the order service.

pub mod entity;
pub mod error;
pub mod repository;
pub mod service;

#[cfg(test)]
pub(crate) mod mock;

pub use error::*;
pub use repository::{OrderRepository, StoreOrderRepository};
pub use service::OrderService;
