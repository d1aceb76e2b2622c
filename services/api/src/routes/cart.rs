//! Cart endpoints for guests and signed-in users

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use shop::models::CartView;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    middleware::RequestIdentity,
    state::AppState,
    throttle::AddToCartGuard,
};

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    pub product_id: Uuid,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: i32,
}

fn cart_body(cart: CartView) -> Json<serde_json::Value> {
    Json(json!({ "success": true, "cart": cart }))
}

pub async fn get_cart(
    State(state): State<AppState>,
    RequestIdentity(identity): RequestIdentity,
) -> ApiResult<impl IntoResponse> {
    Ok(cart_body(state.carts.get_cart(&identity).await?))
}

pub async fn add_to_cart(
    State(state): State<AppState>,
    RequestIdentity(identity): RequestIdentity,
    Json(request): Json<AddToCartRequest>,
) -> ApiResult<impl IntoResponse> {
    if let Some(owner) = identity.owner() {
        let key = AddToCartGuard::key(&owner, request.product_id);
        if !state.add_guard.allow(&key).await {
            return Err(ApiError::TooManyRequests);
        }
    }

    let cart = state
        .carts
        .add_item(&identity, request.product_id, request.quantity)
        .await?;

    Ok(cart_body(cart))
}

pub async fn update_item(
    State(state): State<AppState>,
    RequestIdentity(identity): RequestIdentity,
    Path(product_id): Path<Uuid>,
    Json(request): Json<UpdateQuantityRequest>,
) -> ApiResult<impl IntoResponse> {
    let cart = state
        .carts
        .update_item(&identity, product_id, request.quantity)
        .await?;

    Ok(cart_body(cart))
}

pub async fn remove_item(
    State(state): State<AppState>,
    RequestIdentity(identity): RequestIdentity,
    Path(product_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    Ok(cart_body(state.carts.remove_item(&identity, product_id).await?))
}

pub async fn clear_cart(
    State(state): State<AppState>,
    RequestIdentity(identity): RequestIdentity,
) -> ApiResult<impl IntoResponse> {
    state.carts.clear(&identity).await?;
    Ok(cart_body(CartView::empty()))
}
