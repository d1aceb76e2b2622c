//! Back-office endpoints. Every route here sits behind `require_admin`.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use shop::models::{NewProduct, OrderStatus, ProductFilter, ProductUpdate, Role};
use tracing::info;
use uuid::Uuid;

use crate::{error::ApiResult, middleware::AuthUser, state::AppState};

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: OrderStatus,
}

pub async fn list_users(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let users = state.accounts.list_users().await?;
    Ok(Json(json!({ "success": true, "users": users })))
}

pub async fn set_role(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(request): Json<RoleRequest>,
) -> ApiResult<impl IntoResponse> {
    state.accounts.set_role(auth.id, id, request.role).await?;
    info!(admin_id = %auth.id, user_id = %id, role = %request.role, "role changed");

    Ok(Json(json!({ "success": true })))
}

pub async fn stats(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let stats = state.orders.stats().await?;
    Ok(Json(json!({ "success": true, "stats": stats })))
}

pub async fn list_orders(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let orders = state.orders.list_all().await?;
    Ok(Json(json!({ "success": true, "orders": orders })))
}

pub async fn set_order_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<StatusRequest>,
) -> ApiResult<impl IntoResponse> {
    state.orders.set_status(id, request.status).await?;
    Ok(Json(json!({ "success": true })))
}

pub async fn list_products(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let products = state
        .catalog
        .list_products(&ProductFilter::default())
        .await?;

    Ok(Json(json!({ "success": true, "products": products })))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let product = state.catalog.get_product(id).await?;
    Ok(Json(json!({ "success": true, "product": product })))
}

pub async fn create_product(
    State(state): State<AppState>,
    Json(product): Json<NewProduct>,
) -> ApiResult<impl IntoResponse> {
    let product = state.catalog.create_product(product).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "product": product })),
    ))
}

pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(update): Json<ProductUpdate>,
) -> ApiResult<impl IntoResponse> {
    let product = state.catalog.update_product(id, update).await?;
    Ok(Json(json!({ "success": true, "product": product })))
}

pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    state.catalog.delete_product(id).await?;
    Ok(Json(json!({ "success": true })))
}
