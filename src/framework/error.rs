//! # Store Errors
//!
//! Errors raised by the storage layer itself, independent of any business rule. Every service error
//! wraps this type through `#[from]`, so a store failure always propagates unchanged.

/// Errors that can occur within the store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The store has been shut down.
    #[error("Store closed")]
    Closed,

    /// Waiting for a row lock exceeded the configured lock timeout.
    #[error("Lock wait timeout on {table} {id}")]
    LockTimeout { table: &'static str, id: String },

    /// The row is locked by another session and the caller asked not to wait.
    #[error("Row {table} {id} is locked by another session")]
    RowBusy { table: &'static str, id: String },

    /// A write was attempted on a row the session has not locked.
    #[error("Row {table} {id} is not locked by this session")]
    NotLocked { table: &'static str, id: String },

    /// A unique constraint would be broken by the commit.
    #[error("Unique constraint violated on {table}.{column}: {value}")]
    UniqueViolation {
        table: &'static str,
        column: &'static str,
        value: String,
    },

    /// A referenced row is missing, or a delete is restricted by referencing rows.
    #[error("Foreign key violation on {table} {id}: {detail}")]
    ForeignKeyViolation {
        table: &'static str,
        id: String,
        detail: String,
    },
}

impl StoreError {
    /// Whether the same operation may succeed if simply tried again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StoreError::LockTimeout { .. } | StoreError::RowBusy { .. }
        )
    }
}
