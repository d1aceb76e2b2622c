use axum::{Json, response::IntoResponse};
use serde_json::json;
use uuid::Uuid;

/// Mint a guest session id. Clients send it back in `x-session-id`.
pub async fn create_session() -> impl IntoResponse {
    Json(json!({
        "success": true,
        "sessionId": Uuid::new_v4().to_string(),
    }))
}
