//! User directory: registration, lookup and password authentication.

use std::sync::Arc;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use common::UserId;
use rand_core::OsRng;
use store::{NewUser, Store, User};

use crate::error::{ConstraintViolation, DomainError, Result};

/// Fields supplied when a user signs up. The password is in plain text.
#[derive(Clone)]
pub struct Registration {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("username", &self.username)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

impl Registration {
    fn validate(&self) -> Result<()> {
        let required = [
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("username", &self.username),
            ("email", &self.email),
            ("password", &self.password),
        ];
        match required.iter().find(|(_, value)| value.trim().is_empty()) {
            Some((field, _)) => Err(ConstraintViolation::MissingField(*field).into()),
            None => Ok(()),
        }
    }
}

/// Service for managing users.
#[derive(Clone)]
pub struct UserService<S> {
    store: S,
    pepper: Arc<str>,
}

impl<S: Store> UserService<S> {
    /// Creates a user service. `pepper` is appended to every password
    /// before hashing.
    pub fn new(store: S, pepper: impl Into<String>) -> Self {
        Self {
            store,
            pepper: Arc::from(pepper.into()),
        }
    }

    /// Registers a user, storing an Argon2 digest of the password.
    #[tracing::instrument(skip(self), fields(username = %registration.username))]
    pub async fn create_user(&self, registration: Registration) -> Result<User> {
        registration.validate()?;
        let password_digest = self.hash_password(&registration.password).await?;

        let user = self
            .store
            .insert_user(NewUser {
                first_name: registration.first_name,
                last_name: registration.last_name,
                username: registration.username.clone(),
                email: registration.email,
                password_digest,
            })
            .await
            .map_err(|e| DomainError::from_store("create user", &registration.username, e))?;

        tracing::info!(user_id = %user.id, "User created");
        Ok(user)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_user(&self, user_id: UserId) -> Result<User> {
        self.store
            .find_user(user_id)
            .await
            .map_err(|e| DomainError::from_store("get user", user_id, e))?
            .ok_or_else(|| DomainError::not_found("user", user_id))
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.store
            .list_users()
            .await
            .map_err(|e| DomainError::from_store("list users", "all", e))
    }

    /// Deletes a user. Fails while the user still owns orders.
    #[tracing::instrument(skip(self))]
    pub async fn delete_user(&self, user_id: UserId) -> Result<User> {
        let user = self
            .store
            .delete_user(user_id)
            .await
            .map_err(|e| DomainError::from_store_on_delete("delete user", "user", "orders", user_id, e))?
            .ok_or_else(|| DomainError::not_found("user", user_id))?;

        tracing::info!(user_id = %user.id, "User deleted");
        Ok(user)
    }

    /// Checks a username and password.
    ///
    /// Returns `Ok(None)` for an unknown username and
    /// [`DomainError::InvalidCredentials`] for a wrong password.
    #[tracing::instrument(skip(self, password))]
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<Option<User>> {
        let Some(user) = self
            .store
            .find_user_by_username(username)
            .await
            .map_err(|e| DomainError::from_store("authenticate user", username, e))?
        else {
            metrics::counter!("users_authenticated_total", "outcome" => "unknown_user")
                .increment(1);
            return Ok(None);
        };

        if !self.verify_password(&user.password_digest, password).await? {
            metrics::counter!("users_authenticated_total", "outcome" => "rejected").increment(1);
            tracing::warn!(user_id = %user.id, "Password rejected");
            return Err(DomainError::InvalidCredentials);
        }

        metrics::counter!("users_authenticated_total", "outcome" => "accepted").increment(1);
        Ok(Some(user))
    }

    async fn hash_password(&self, password: &str) -> Result<String> {
        let peppered = format!("{password}{}", self.pepper);
        run_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            Argon2::default()
                .hash_password(peppered.as_bytes(), &salt)
                .map(|hash| hash.to_string())
                .map_err(|e| DomainError::PasswordHash(e.to_string()))
        })
        .await
    }

    async fn verify_password(&self, digest: &str, password: &str) -> Result<bool> {
        let digest = digest.to_string();
        let peppered = format!("{password}{}", self.pepper);
        run_blocking(move || {
            let parsed = PasswordHash::new(&digest).map_err(|e| {
                tracing::error!(error = %e, "Stored password digest is unreadable");
                DomainError::PasswordHash(e.to_string())
            })?;

            match Argon2::default().verify_password(peppered.as_bytes(), &parsed) {
                Ok(()) => Ok(true),
                Err(argon2::password_hash::Error::Password) => Ok(false),
                Err(e) => Err(DomainError::PasswordHash(e.to_string())),
            }
        })
        .await
    }
}

/// Runs Argon2 work on the blocking thread pool.
async fn run_blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| DomainError::PasswordHash(e.to_string()))?
}
