use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use shop::models::CustomerDetails;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    middleware::AuthUser,
    state::AppState,
};

/// Turn the caller's cart into an order. The body is optional; missing
/// contact fields fall back to the profile. A body that is sent but does not
/// parse is rejected.
pub async fn create_order(
    State(state): State<AppState>,
    auth: AuthUser,
    details: Result<Json<CustomerDetails>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let details = match details {
        Ok(Json(details)) => details,
        Err(JsonRejection::MissingJsonContentType(_)) => CustomerDetails::default(),
        Err(rejection) => return Err(ApiError::InvalidBody(rejection.body_text())),
    };
    let order = state.orders.place_order(auth.id, details).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": format!("Order {} placed", order.order_number),
            "order": order,
        })),
    ))
}

pub async fn my_orders(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<impl IntoResponse> {
    let orders = state.orders.list_for_user(auth.id).await?;
    Ok(Json(json!({ "success": true, "orders": orders })))
}

pub async fn get_order(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let order = state.orders.get_for_user(auth.id, id).await?;
    Ok(Json(json!({ "success": true, "order": order })))
}
