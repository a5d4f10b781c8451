//! Helpers for the transport layer: error mapping and pagination.
//!
//! No router lives here. Whatever serves HTTP calls the services and uses these types to turn
//! their results into responses.

pub mod error;
pub mod page;

pub use error::{ApiError, ErrorBody};
pub use page::{Page, PageParams};
