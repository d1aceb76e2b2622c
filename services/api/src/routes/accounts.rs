//! Registration, login and the caller's profile

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;
use shop::models::{LoginCredentials, ProfileUpdate, Registration, User};

use crate::{
    error::ApiResult,
    middleware::{AuthUser, GuestSession},
    state::AppState,
};

/// Move the guest cart of this request onto the user's cart
async fn merge_session_cart(state: &AppState, session: &GuestSession, user: &User) -> ApiResult<()> {
    if let Some(session_id) = session.0.as_deref() {
        state.carts.merge_guest_cart(session_id, user.id).await?;
    }
    Ok(())
}

fn session_body(state: &AppState, user: &User) -> ApiResult<serde_json::Value> {
    let token = state.jwt.issue(user)?;
    Ok(json!({
        "success": true,
        "token": token,
        "expiresIn": state.jwt.expiry_seconds(),
        "user": user,
    }))
}

/// Create an account and adopt the guest cart
pub async fn register(
    State(state): State<AppState>,
    session: GuestSession,
    Json(registration): Json<Registration>,
) -> ApiResult<impl IntoResponse> {
    let user = state.accounts.register(registration).await?;
    merge_session_cart(&state, &session, &user).await?;

    Ok((StatusCode::CREATED, Json(session_body(&state, &user)?)))
}

/// Log in and adopt the guest cart
pub async fn login(
    State(state): State<AppState>,
    session: GuestSession,
    Json(credentials): Json<LoginCredentials>,
) -> ApiResult<impl IntoResponse> {
    let user = state.accounts.login(credentials).await?;
    merge_session_cart(&state, &session, &user).await?;

    Ok(Json(session_body(&state, &user)?))
}

pub async fn current_user(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<impl IntoResponse> {
    let user = state.accounts.get_user(auth.id).await?;
    Ok(Json(json!({ "success": true, "user": user })))
}

pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(update): Json<ProfileUpdate>,
) -> ApiResult<impl IntoResponse> {
    let user = state.accounts.update_profile(auth.id, update).await?;
    Ok(Json(json!({ "success": true, "user": user })))
}
