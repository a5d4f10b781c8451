//! # Entity Trait
//!
//! The `Entity` trait defines the contract that every stored record (User, Product, Order) must
//! implement to live in a [`Table`](super::Table). It specifies associated types for the id, the
//! creation payload, the partial-update patch and the record's error type.
//!
//! # Architecture Note
//! By defining one contract that all record types satisfy, the table, the per-transaction staging
//! area and the session are written *once* and reused for every relation.
//!
//! Associated types keep the payloads apart: a `User` is built from a `NewUser`, and a `ProductPatch`
//! can never be applied to an `Order`. The compiler rules this class of bugs out.
//!
//! # Patches instead of attribute bags
//! Partial updates go through an explicit `Patch` type listing only the updatable fields. A record
//! that must never change after creation uses [`std::convert::Infallible`] as its patch.

use std::fmt::{Debug, Display};
use std::hash::Hash;

/// Trait that any record must implement to be stored in a [`Table`](super::Table).
pub trait Entity: Clone + Debug + Send + Sync + 'static {
    /// The unique identifier for this record.
    /// Must be convertible from `u32` so tables can allocate ids from a sequence.
    type Id: Copy + Ord + Hash + Send + Sync + Display + Debug + From<u32>;

    /// The data required to create a new instance (DTO).
    type Create: Send + Debug;

    /// The data accepted by a partial update.
    type Patch: Send + Debug;

    /// The error type for validation failures while building or patching the record.
    ///
    /// # Design Note: Error Granularity
    ///
    /// One error enum per record type rather than one per operation. Callers match on a single
    /// `ProductError`, which must therefore be the union of everything that can go wrong with a product.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Table name used in logs and store errors.
    const TABLE: &'static str;

    /// The id of this record.
    fn id(&self) -> Self::Id;

    /// Construct the full record from the allocated id and the payload.
    fn from_create_params(id: Self::Id, params: Self::Create) -> Result<Self, Self::Error>;

    /// Apply a partial update in place. Either every field of the patch is applied or none is.
    fn apply_patch(&mut self, patch: Self::Patch) -> Result<(), Self::Error>;
}
