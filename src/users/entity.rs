//! [`Entity`] implementation for [`User`] and the field rules shared with registration.

use super::error::UserError;
use crate::framework::Entity;
use crate::model::{NewUser, User, UserId, UserPatch};

pub const NAME_MAX_CHARS: usize = 100;
pub const EMAIL_MAX_CHARS: usize = 254;
pub const PASSWORD_MIN_CHARS: usize = 8;
pub const PASSWORD_MAX_CHARS: usize = 128;

pub fn validate_name(name: &str) -> Result<(), UserError> {
    let len = name.chars().count();
    if len == 0 || len > NAME_MAX_CHARS {
        return Err(UserError::Validation(format!(
            "name must be 1 to {NAME_MAX_CHARS} characters"
        )));
    }
    Ok(())
}

/// Shape check only: one `@`, something on both sides, a dot in the domain, no whitespace.
pub fn validate_email(email: &str) -> Result<(), UserError> {
    let invalid = || UserError::Validation(format!("invalid email: {email}"));
    if email.chars().count() > EMAIL_MAX_CHARS || email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty()
        || domain.contains('@')
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
    {
        return Err(invalid());
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), UserError> {
    let len = password.chars().count();
    if !(PASSWORD_MIN_CHARS..=PASSWORD_MAX_CHARS).contains(&len) {
        return Err(UserError::Validation(format!(
            "password must be {PASSWORD_MIN_CHARS} to {PASSWORD_MAX_CHARS} characters"
        )));
    }
    Ok(())
}

impl Entity for User {
    type Id = UserId;
    type Create = NewUser;
    type Patch = UserPatch;
    type Error = UserError;
    const TABLE: &'static str = "users";

    fn id(&self) -> UserId {
        self.id
    }

    fn from_create_params(id: UserId, params: NewUser) -> Result<Self, UserError> {
        validate_name(&params.name)?;
        validate_email(&params.email)?;
        Ok(Self {
            id,
            name: params.name,
            email: params.email,
            password_hash: params.password_hash,
            role: params.role,
        })
    }

    fn apply_patch(&mut self, patch: UserPatch) -> Result<(), UserError> {
        if let Some(name) = &patch.name {
            validate_name(name)?;
        }
        if let Some(email) = &patch.email {
            validate_email(email)?;
        }
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(email) = patch.email {
            self.email = email;
        }
        Ok(())
    }
}
