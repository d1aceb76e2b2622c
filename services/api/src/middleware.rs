//! Request identity extraction and role checks

use std::convert::Infallible;

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use shop::ShopError;
use shop::models::{Identity, Role, has_role};
use tracing::warn;
use uuid::Uuid;

use crate::{error::ApiError, jwt::Claims, state::AppState};

/// Header carrying the anonymous session id of a guest
pub const SESSION_HEADER: &str = "x-session-id";

/// Authenticated user information
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
}

/// The caller's cart identity: an optional bearer token plus an optional
/// guest session id
#[derive(Debug, Clone)]
pub struct RequestIdentity(pub Identity);

/// The guest session id alone. Login and registration use this so a stale
/// bearer token left on the client does not block signing in again.
#[derive(Debug, Clone, Default)]
pub struct GuestSession(pub Option<String>);

/// Verify the bearer token if one was sent. A malformed or expired token is
/// an error rather than an anonymous request.
async fn bearer_claims(parts: &mut Parts, state: &AppState) -> Result<Option<Claims>, ApiError> {
    match TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state).await {
        Ok(TypedHeader(Authorization(bearer))) => {
            let claims = state.jwt.verify(bearer.token()).map_err(|e| {
                warn!("Failed to validate token: {}", e);
                ApiError::Unauthorized
            })?;
            Ok(Some(claims))
        }
        Err(rejection) if rejection.is_missing() => Ok(None),
        Err(_) => Err(ApiError::Unauthorized),
    }
}

fn session_id(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let claims = bearer_claims(parts, state)
            .await?
            .ok_or(ApiError::Unauthorized)?;

        Ok(AuthUser {
            id: claims.sub,
            role: claims.role,
        })
    }
}

#[async_trait]
impl FromRequestParts<AppState> for RequestIdentity {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user_id = bearer_claims(parts, state).await?.map(|claims| claims.sub);

        Ok(RequestIdentity(Identity {
            user_id,
            session_id: session_id(parts),
        }))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for GuestSession {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(GuestSession(session_id(parts)))
    }
}

/// Admin guard middleware
///
/// Reloads the user so a role change takes effect without a new token.
pub async fn require_admin(
    State(state): State<AppState>,
    auth: AuthUser,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = match state.accounts.get_user(auth.id).await {
        Ok(user) => user,
        Err(ShopError::NotFound { .. }) => return Err(ApiError::Unauthorized),
        Err(e) => return Err(e.into()),
    };

    if !has_role(&user, Role::Admin) {
        warn!(user_id = %user.id, "non-admin request to admin route");
        return Err(ApiError::Forbidden);
    }

    Ok(next.run(req).await)
}
