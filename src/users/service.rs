//! # User Service
//!
//! Registration, login and the owner-or-admin rules for reading and changing user records.
//! Token checks live here too: [`UserService::authenticate`] turns a bearer token into a
//! [`Principal`] and refuses tokens of users that no longer exist.

use super::entity::{validate_email, validate_name, validate_password};
use super::error::UserError;
use super::repository::UserRepository;
use crate::auth::{AccessToken, PasswordError, PasswordHasher, Principal, TokenIssuer};
use crate::events::{EventClient, Notice};
use crate::framework::Entity;
use crate::model::{NewUser, Role, User, UserId, UserPatch, UserRegistration};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct UserService {
    repo: UserRepository,
    hasher: Arc<PasswordHasher>,
    tokens: Arc<TokenIssuer>,
    events: Option<EventClient>,
}

impl UserService {
    pub fn new(repo: UserRepository, hasher: Arc<PasswordHasher>, tokens: Arc<TokenIssuer>) -> Self {
        Self {
            repo,
            hasher,
            tokens,
            events: None,
        }
    }

    pub fn with_events(mut self, events: EventClient) -> Self {
        self.events = Some(events);
        self
    }

    /// Registers a `user`-role account.
    #[tracing::instrument(skip_all, fields(email = %registration.email))]
    pub async fn register(&mut self, registration: UserRegistration) -> Result<User, UserError> {
        validate_name(&registration.name)?;
        validate_email(&registration.email)?;
        validate_password(&registration.password)?;

        if self.repo.get_by_email(&registration.email).await?.is_some() {
            warn!("Email already registered");
            return Err(UserError::AlreadyExists(registration.email));
        }

        let hasher = Arc::clone(&self.hasher);
        let password = registration.password;
        let password_hash = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| PasswordError::Hash(e.to_string()))??;

        let user = self
            .repo
            .create(NewUser {
                name: registration.name,
                email: registration.email,
                password_hash,
                role: Role::User,
            })
            .await
            .inspect_err(|e| warn!(error = %e, "Registration failed"))?;

        info!(user_id = %user.id, "User registered");
        if let Some(events) = &self.events {
            events.notify(Notice::UserRegistered {
                user_id: user.id,
                email: user.email.clone(),
            });
        }
        Ok(user)
    }

    /// Checks the password and issues an access token.
    #[tracing::instrument(skip_all, fields(%email))]
    pub async fn login(&self, email: &str, password: &str) -> Result<AccessToken, UserError> {
        let Some(user) = self.repo.get_by_email(email).await? else {
            debug!("Unknown email");
            return Err(UserError::InvalidCredentials);
        };

        let hasher = Arc::clone(&self.hasher);
        let (password, hash) = (password.to_string(), user.password_hash.clone());
        let valid = tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .unwrap_or(false);
        if !valid {
            debug!(user_id = %user.id, "Wrong password");
            return Err(UserError::InvalidCredentials);
        }

        let token = self.tokens.issue(&user)?;
        info!(user_id = %user.id, "Logged in");
        Ok(token)
    }

    /// Resolves a bearer token to the principal of a user that still exists.
    ///
    /// The role is taken from the stored user, not from the token.
    pub async fn authenticate(&self, token: &str) -> Result<Principal, UserError> {
        let claims = self.tokens.verify(token).map_err(|e| {
            debug!(error = %e, "Token rejected");
            UserError::InvalidCredentials
        })?;
        let principal = claims
            .principal()
            .map_err(|_| UserError::InvalidCredentials)?;
        let user = self
            .repo
            .get_by_id(principal.id)
            .await?
            .ok_or(UserError::InvalidCredentials)?;
        Ok(Principal {
            id: user.id,
            role: user.role,
        })
    }

    pub async fn list_users(&self) -> Result<Vec<User>, UserError> {
        self.repo.list().await
    }

    pub async fn get_user(&self, id: UserId, principal: &Principal) -> Result<User, UserError> {
        let user = self.repo.get_by_id(id).await?.ok_or(UserError::NotFound(id))?;
        if !principal.can_act_for(id) {
            return Err(UserError::Unauthorized);
        }
        Ok(user)
    }

    #[tracing::instrument(skip_all, fields(user_id = %id, principal = %principal.id))]
    pub async fn update_user(
        &mut self,
        id: UserId,
        patch: UserPatch,
        principal: &Principal,
    ) -> Result<User, UserError> {
        let result = self.try_update(id, patch, principal).await;
        match &result {
            Ok(_) => info!("User updated"),
            Err(e) => {
                warn!(error = %e, "User update rejected");
                self.repo.rollback();
            }
        }
        result
    }

    async fn try_update(
        &mut self,
        id: UserId,
        patch: UserPatch,
        principal: &Principal,
    ) -> Result<User, UserError> {
        let mut user = self.repo.lock_by_id(id).await?.ok_or(UserError::NotFound(id))?;
        if !principal.can_act_for(id) {
            return Err(UserError::Unauthorized);
        }
        if let Some(email) = patch.email.as_deref().filter(|e| *e != user.email) {
            if self.repo.get_by_email(email).await?.is_some() {
                return Err(UserError::AlreadyExists(email.to_string()));
            }
        }
        user.apply_patch(patch)?;
        self.repo.save(user.clone())?;
        self.repo.commit().await?;
        Ok(user)
    }

    /// Deletes a user. Their orders follow the store's user delete policy.
    #[tracing::instrument(skip_all, fields(user_id = %id))]
    pub async fn delete_user(&mut self, id: UserId) -> Result<(), UserError> {
        let result = match self.repo.delete(id).await {
            Ok(true) => self.repo.commit().await,
            Ok(false) => Err(UserError::NotFound(id)),
            Err(e) => Err(e),
        };
        match &result {
            Ok(()) => info!("User deleted"),
            Err(e) => {
                warn!(error = %e, "User delete rejected");
                self.repo.rollback();
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Store, StoreOptions};
    use chrono::Duration;

    fn service(store: &Store) -> UserService {
        UserService::new(
            UserRepository::new(store.session()),
            Arc::new(PasswordHasher::new(1024, 1).unwrap()),
            Arc::new(TokenIssuer::new("test-secret", Duration::minutes(30))),
        )
    }

    fn registration(email: &str) -> UserRegistration {
        UserRegistration {
            name: "Ada".to_string(),
            email: email.to_string(),
            password: "analytical".to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_login_authenticate() {
        let store = Store::open(StoreOptions::default());
        let mut users = service(&store);

        let ada = users.register(registration("ada@example.com")).await.unwrap();
        assert_eq!(ada.role, Role::User);
        assert_ne!(ada.password_hash, "analytical");

        let token = users.login("ada@example.com", "analytical").await.unwrap();
        let principal = users.authenticate(&token.access_token).await.unwrap();
        assert_eq!(principal, Principal { id: ada.id, role: Role::User });
    }

    #[tokio::test]
    async fn test_duplicate_email_and_bad_login() {
        let store = Store::open(StoreOptions::default());
        let mut users = service(&store);
        users.register(registration("ada@example.com")).await.unwrap();

        assert_eq!(
            users.register(registration("ada@example.com")).await.unwrap_err(),
            UserError::AlreadyExists("ada@example.com".to_string())
        );
        assert_eq!(
            users.login("ada@example.com", "wrong-password").await.unwrap_err(),
            UserError::InvalidCredentials
        );
        assert_eq!(
            users.login("bob@example.com", "analytical").await.unwrap_err(),
            UserError::InvalidCredentials
        );
    }

    #[tokio::test]
    async fn test_short_password_is_rejected() {
        let store = Store::open(StoreOptions::default());
        let mut users = service(&store);
        let mut short = registration("ada@example.com");
        short.password = "short".to_string();
        assert!(matches!(
            users.register(short).await,
            Err(UserError::Validation(_))
        ));
        assert_eq!(store.row_count::<User>().await, 0);
    }

    #[tokio::test]
    async fn test_owner_or_admin_may_update() {
        let store = Store::open(StoreOptions::default());
        let mut users = service(&store);
        let ada = users.register(registration("ada@example.com")).await.unwrap();
        let bob = users.register(registration("bob@example.com")).await.unwrap();
        let as_bob = Principal { id: bob.id, role: Role::User };

        let patch = UserPatch {
            name: Some("Ada L".to_string()),
            ..UserPatch::default()
        };
        assert_eq!(
            users.update_user(ada.id, patch.clone(), &as_bob).await.unwrap_err(),
            UserError::Unauthorized
        );
        assert_eq!(
            users.get_user(ada.id, &as_bob).await.unwrap_err(),
            UserError::Unauthorized
        );

        let admin = Principal { id: UserId(99), role: Role::Admin };
        let updated = users.update_user(ada.id, patch, &admin).await.unwrap();
        assert_eq!(updated.name, "Ada L");

        let steal = UserPatch {
            email: Some("bob@example.com".to_string()),
            ..UserPatch::default()
        };
        let as_ada = Principal { id: ada.id, role: Role::User };
        assert_eq!(
            users.update_user(ada.id, steal, &as_ada).await.unwrap_err(),
            UserError::AlreadyExists("bob@example.com".to_string())
        );
    }

    #[tokio::test]
    async fn test_deleted_user_token_stops_working() {
        let store = Store::open(StoreOptions::default());
        let mut users = service(&store);
        let ada = users.register(registration("ada@example.com")).await.unwrap();
        let token = users.login("ada@example.com", "analytical").await.unwrap();

        users.delete_user(ada.id).await.unwrap();
        assert_eq!(
            users.authenticate(&token.access_token).await.unwrap_err(),
            UserError::InvalidCredentials
        );
        assert_eq!(
            users.delete_user(ada.id).await.unwrap_err(),
            UserError::NotFound(ada.id)
        );
        assert_eq!(
            users.authenticate("garbage").await.unwrap_err(),
            UserError::InvalidCredentials
        );
    }
}
