//! API service routes

use axum::{
    Json, Router, middleware,
    response::IntoResponse,
    routing::{delete, get, post, put},
};
use serde_json::json;

use crate::{middleware::require_admin, state::AppState};

mod accounts;
mod admin;
mod cart;
mod catalog;
mod orders;
mod session;

/// Create the router for the API service
pub fn create_router(state: AppState) -> Router {
    let admin_routes = Router::new()
        .route("/users", get(admin::list_users))
        .route("/users/:id/role", put(admin::set_role))
        .route("/stats", get(admin::stats))
        .route("/orders", get(admin::list_orders))
        .route("/orders/:id/status", put(admin::set_order_status))
        .route(
            "/products",
            get(admin::list_products).post(admin::create_product),
        )
        .route(
            "/products/:id",
            get(admin::get_product)
                .put(admin::update_product)
                .delete(admin::delete_product),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/session", post(session::create_session))
        .route("/register", post(accounts::register))
        .route("/login", post(accounts::login))
        .route(
            "/user",
            get(accounts::current_user).put(accounts::update_profile),
        )
        .route("/products", get(catalog::list_products))
        .route("/products/:id", get(catalog::get_product))
        .route("/cart", get(cart::get_cart).delete(cart::clear_cart))
        .route("/cart/add", post(cart::add_to_cart))
        .route("/cart/update/:product_id", put(cart::update_item))
        .route("/cart/remove/:product_id", delete(cart::remove_item))
        .route("/orders/create", post(orders::create_order))
        .route("/orders/my", get(orders::my_orders))
        .route("/orders/:id", get(orders::get_order))
        .nest("/admin", admin_routes);

    Router::new().nest("/api", api_routes).with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "market-api"
    }))
}
