//! Account registration, login and profile management

use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{LoginCredentials, NewUser, ProfileUpdate, Registration, Role, User};
use crate::store::Store;
use crate::validation::{validate_email, validate_name, validate_password, validate_phone};
use crate::{Result, ShopError};

/// Hash a password with Argon2 and a random salt
pub async fn hash_password(password: &str) -> Result<String> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut rand::thread_rng());
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| ShopError::PasswordHash(e.to_string()))
    })
    .await
    .map_err(|e| ShopError::PasswordHash(e.to_string()))?
}

/// Verify a password against a stored Argon2 hash
pub async fn verify_password(password: &str, password_hash: &str) -> Result<bool> {
    let password = password.to_owned();
    let password_hash = password_hash.to_owned();
    tokio::task::spawn_blocking(move || {
        let parsed =
            PasswordHash::new(&password_hash).map_err(|e| ShopError::PasswordHash(e.to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    })
    .await
    .map_err(|e| ShopError::PasswordHash(e.to_string()))?
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Account service
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn Store>,
}

impl AccountService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Register a new user account with the `user` role
    pub async fn register(&self, registration: Registration) -> Result<User> {
        self.create(registration, Role::User).await
    }

    /// Create an account with an explicit role
    pub async fn create(&self, registration: Registration, role: Role) -> Result<User> {
        let email = normalize_email(&registration.email);
        validate_email(&email).map_err(ShopError::Validation)?;
        validate_password(&registration.password).map_err(ShopError::Validation)?;
        validate_name(&registration.name).map_err(ShopError::Validation)?;
        let phone = registration.phone.unwrap_or_default();
        validate_phone(&phone).map_err(ShopError::Validation)?;

        if self.store.find_user_by_email(&email).await?.is_some() {
            return Err(ShopError::EmailTaken(email));
        }

        let password_hash = hash_password(&registration.password).await?;
        let user = self
            .store
            .insert_user(NewUser {
                email,
                password_hash,
                name: registration.name.trim().to_string(),
                phone,
                address: registration.address.unwrap_or_default(),
                role,
            })
            .await?;

        info!(user_id = %user.id, "registered user");
        Ok(user)
    }

    /// Authenticate by email and password
    pub async fn login(&self, credentials: LoginCredentials) -> Result<User> {
        let email = normalize_email(&credentials.email);
        let Some(user) = self.store.find_user_by_email(&email).await? else {
            warn!("login attempt for unknown email");
            return Err(ShopError::InvalidCredentials);
        };

        if !verify_password(&credentials.password, &user.password_hash).await? {
            warn!(user_id = %user.id, "login attempt with wrong password");
            return Err(ShopError::InvalidCredentials);
        }

        Ok(user)
    }

    pub async fn get_user(&self, id: Uuid) -> Result<User> {
        self.store
            .find_user(id)
            .await?
            .ok_or_else(|| ShopError::not_found("user", id))
    }

    /// Update the caller's own name, phone and address
    pub async fn update_profile(&self, id: Uuid, update: ProfileUpdate) -> Result<User> {
        if let Some(name) = &update.name {
            validate_name(name).map_err(ShopError::Validation)?;
        }
        if let Some(phone) = &update.phone {
            validate_phone(phone).map_err(ShopError::Validation)?;
        }
        if update.is_empty() {
            return self.get_user(id).await;
        }

        self.store
            .update_profile(id, &update)
            .await?
            .ok_or_else(|| ShopError::not_found("user", id))
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.store.list_users().await
    }

    /// Change another user's role. Administrators cannot change their own.
    pub async fn set_role(&self, actor: Uuid, target: Uuid, role: Role) -> Result<()> {
        if actor == target {
            return Err(ShopError::Validation("cannot change your own role".into()));
        }
        if !self.store.set_role(target, role).await? {
            return Err(ShopError::not_found("user", target));
        }
        info!(%actor, %target, %role, "changed user role");
        Ok(())
    }
}
