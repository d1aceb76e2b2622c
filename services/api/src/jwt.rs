//! JWT issuing and verification
//!
//! Tokens are signed with HS256 using the configured secret and carry the
//! user id and role.

use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use shop::models::{Role, User};
use thiserror::Error;
use uuid::Uuid;

use crate::settings::AuthSettings;

#[derive(Error, Debug)]
pub enum JwtError {
    #[error("system clock is before the unix epoch")]
    Clock,

    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: Uuid,
    /// Role at the time the token was issued
    pub role: Role,
    /// Issued at time
    pub iat: u64,
    /// Expiration time
    pub exp: u64,
}

/// JWT service
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    expiry_seconds: u64,
}

impl JwtService {
    pub fn new(settings: &AuthSettings) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        Self {
            encoding_key: EncodingKey::from_secret(settings.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(settings.jwt_secret.as_bytes()),
            validation,
            expiry_seconds: settings.token_expiry_seconds,
        }
    }

    /// Generate an access token for a user
    pub fn issue(&self, user: &User) -> Result<String, JwtError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| JwtError::Clock)?
            .as_secs();

        let claims = Claims {
            sub: user.id,
            role: user.role,
            iat: now,
            exp: now + self.expiry_seconds,
        };

        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding_key,
        )?)
    }

    /// Validate a token and return the claims
    pub fn verify(&self, token: &str) -> Result<Claims, JwtError> {
        Ok(decode::<Claims>(token, &self.decoding_key, &self.validation)?.claims)
    }

    pub fn expiry_seconds(&self) -> u64 {
        self.expiry_seconds
    }
}
