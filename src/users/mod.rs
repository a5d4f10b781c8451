//! Users: registration, login, token resolution and account management.

pub mod entity;
pub mod error;
pub mod repository;
pub mod service;

pub use error::*;
pub use repository::UserRepository;
pub use service::UserService;
