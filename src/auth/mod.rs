//! # Identity
//!
//! The order core never sees credentials. It is handed a [`Principal`]: the id and role of an
//! already authenticated caller. This module produces principals:
//!
//! - [`PasswordHasher`] hashes and verifies passwords with Argon2id.
//! - [`TokenIssuer`] signs and checks HS256 access tokens.
//! - [`require_admin`] is the role gate for admin-only operations.

pub mod password;
pub mod token;

pub use password::{PasswordError, PasswordHasher};
pub use token::{AccessToken, Claims, TokenError, TokenIssuer};

use crate::model::{Role, UserId};
use crate::users::UserError;

/// An authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub id: UserId,
    pub role: Role,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Admins act for everyone; users only for themselves.
    pub fn can_act_for(&self, user_id: UserId) -> bool {
        self.is_admin() || self.id == user_id
    }
}

/// Fails with [`UserError::Unauthorized`] unless the principal is an admin.
pub fn require_admin(principal: &Principal) -> Result<(), UserError> {
    if principal.is_admin() {
        Ok(())
    } else {
        Err(UserError::Unauthorized)
    }
}
