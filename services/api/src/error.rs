//! Custom error types for the API service

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use shop::ShopError;
use thiserror::Error;
use tracing::error;

use crate::jwt::JwtError;

/// Custom error type for the API service
#[derive(Error, Debug)]
pub enum ApiError {
    /// Missing, invalid or expired token
    #[error("Unauthorized")]
    Unauthorized,

    /// Authenticated but lacking the required role
    #[error("Forbidden")]
    Forbidden,

    /// Duplicate add-to-cart inside the guard window
    #[error("Too many requests")]
    TooManyRequests,

    /// Request body present but unreadable
    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    /// Domain failure
    #[error(transparent)]
    Shop(#[from] ShopError),

    /// Token could not be issued
    #[error("Token error: {0}")]
    Token(#[from] JwtError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            ApiError::Forbidden => (StatusCode::FORBIDDEN, "Forbidden".to_string()),
            ApiError::InvalidBody(detail) => (
                StatusCode::BAD_REQUEST,
                format!("Invalid request body: {detail}"),
            ),
            ApiError::TooManyRequests => (
                StatusCode::TOO_MANY_REQUESTS,
                "Too many requests".to_string(),
            ),
            ApiError::Token(e) => {
                error!("Failed to issue token: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            ApiError::Shop(e) => match e {
                ShopError::NotFound { .. } => (StatusCode::NOT_FOUND, e.to_string()),
                ShopError::InsufficientStock { .. }
                | ShopError::EmptyCart
                | ShopError::IdentityRequired
                | ShopError::Validation(_) => (StatusCode::BAD_REQUEST, e.to_string()),
                ShopError::Conflict(_) | ShopError::EmailTaken(_) => {
                    (StatusCode::CONFLICT, e.to_string())
                }
                ShopError::InvalidCredentials => (StatusCode::UNAUTHORIZED, e.to_string()),
                ShopError::TransactionFailed(_)
                | ShopError::PasswordHash(_)
                | ShopError::Database(_) => {
                    error!("Request failed: {}", e);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Internal server error".to_string(),
                    )
                }
            },
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;
