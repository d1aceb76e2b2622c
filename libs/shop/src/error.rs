//! Error types for the marketplace core

use thiserror::Error;
use uuid::Uuid;

/// Failures raised by the cart, order, catalog and account services.
#[derive(Error, Debug)]
pub enum ShopError {
    /// A product, order or user does not exist
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// More units were requested than the product has in stock
    #[error("insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: Uuid,
        requested: i32,
        available: i32,
    },

    /// Neither a user id nor a session id accompanied a cart mutation
    #[error("a user or session identity is required")]
    IdentityRequired,

    /// A storage error inside a multi-statement commit; the transaction was rolled back
    #[error("transaction failed: {0}")]
    TransactionFailed(#[source] sqlx::Error),

    /// An order was requested for an empty cart
    #[error("cart is empty")]
    EmptyCart,

    /// Registration with an email that already has an account
    #[error("a user with email {0} already exists")]
    EmailTaken(String),

    /// Unknown email or wrong password
    #[error("invalid email or password")]
    InvalidCredentials,

    /// Input rejected before reaching storage
    #[error("{0}")]
    Validation(String),

    /// The operation collides with existing data
    #[error("{0}")]
    Conflict(String),

    /// Password hashing or verification could not run
    #[error("password hashing failed: {0}")]
    PasswordHash(String),

    /// Any other storage error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ShopError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

/// Result type for marketplace operations.
pub type Result<T> = std::result::Result<T, ShopError>;
