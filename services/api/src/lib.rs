//! HTTP surface of the marketplace
//!
//! Wires the [`shop`] services into an axum router. Guests are identified by
//! the `x-session-id` header, signed-in users by a bearer token.

use axum::Router;
use tower_http::trace::TraceLayer;

pub mod error;
pub mod jwt;
pub mod middleware;
pub mod routes;
pub mod settings;
pub mod state;
pub mod throttle;

pub use state::AppState;

/// Build the application with request tracing
pub fn create_app(state: AppState) -> Router {
    routes::create_router(state).layer(TraceLayer::new_for_http())
}
