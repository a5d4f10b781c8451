//! Data access for users over one [`Session`].

use super::error::UserError;
use crate::db::Session;
use crate::framework::{Entity, StoreError};
use crate::model::{NewUser, User, UserId};

pub struct UserRepository {
    session: Session,
}

/// A unique-index hit on email at commit time means a concurrent registration won.
fn email_taken(error: StoreError) -> UserError {
    match error {
        StoreError::UniqueViolation {
            column: "email",
            value,
            ..
        } => UserError::AlreadyExists(value),
        other => UserError::Store(other),
    }
}

impl UserRepository {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    pub async fn create(&mut self, params: NewUser) -> Result<User, UserError> {
        let id = self.session.next_id::<User>().await?;
        let user = User::from_create_params(id, params)?;
        self.session.insert(user.clone())?;
        self.session.commit().await.map_err(email_taken)?;
        Ok(user)
    }

    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, UserError> {
        Ok(self.session.get::<User>(id).await?)
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>, UserError> {
        let mut found = self.session.scan::<User>(|u| u.email == email).await?;
        Ok(found.pop())
    }

    pub async fn lock_by_id(&mut self, id: UserId) -> Result<Option<User>, UserError> {
        Ok(self.session.lock::<User>(id).await?)
    }

    pub async fn list(&self) -> Result<Vec<User>, UserError> {
        Ok(self.session.scan::<User>(|_| true).await?)
    }

    pub fn save(&mut self, user: User) -> Result<(), UserError> {
        self.session.update(user)?;
        Ok(())
    }

    /// Deletes the user, following the store's user delete policy for their orders.
    pub async fn delete(&mut self, id: UserId) -> Result<bool, UserError> {
        Ok(self.session.delete_user(id).await?)
    }

    /// Commits; a duplicate `email` is reported as [`UserError::AlreadyExists`].
    pub async fn commit(&mut self) -> Result<(), UserError> {
        self.session.commit().await.map_err(email_taken)
    }

    pub fn rollback(&mut self) {
        self.session.rollback();
    }
}
