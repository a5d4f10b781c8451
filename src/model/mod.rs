//! Pure data structures for the three stored relations.
//!
//! The [`Entity`](crate::framework::Entity) implementations live next to the services that own
//! each record ([`crate::users`], [`crate::products`], [`crate::orders`]).

pub mod order;
pub mod product;
pub mod user;

pub use order::*;
pub use product::*;
pub use user::*;
