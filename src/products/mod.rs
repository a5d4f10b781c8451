//! Product catalog: stock helpers, data access and the product service.

pub mod entity;
pub mod error;
pub mod repository;
pub mod service;
mod stock;

pub use error::*;
pub use repository::ProductRepository;
pub use service::ProductService;

use crate::cache::CacheClient;
use crate::model::{Product, ProductId};

/// Client of the cache holding recently read products.
pub type ProductCache = CacheClient<ProductId, Product>;
