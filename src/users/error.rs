//! Error types for the identity layer.

use crate::auth::{PasswordError, TokenError};
use crate::framework::StoreError;
use crate::model::UserId;
use thiserror::Error;

/// Errors that can occur during user operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum UserError {
    #[error("Email already registered")]
    AlreadyExists(String),

    /// Unknown email, wrong password, or a token that does not resolve to a user.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("User not found")]
    NotFound(UserId),

    #[error("Not authorized")]
    Unauthorized,

    #[error("Invalid user: {0}")]
    Validation(String),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
