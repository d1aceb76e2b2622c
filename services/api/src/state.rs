//! Application state shared across handlers

use std::sync::Arc;
use std::time::Duration;

use shop::store::Store;
use shop::{AccountService, CartService, CatalogService, OrderService};

use crate::jwt::JwtService;
use crate::settings::Settings;
use crate::throttle::{AddToCartGuard, AddToCartGuardConfig};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub accounts: AccountService,
    pub carts: CartService,
    pub orders: OrderService,
    pub catalog: CatalogService,
    pub jwt: JwtService,
    pub add_guard: AddToCartGuard,
}

impl AppState {
    /// Wire the services over a store
    pub fn new(store: Arc<dyn Store>, settings: &Settings) -> Self {
        let carts = CartService::new(store.clone(), settings.cart.merge_policy);

        Self {
            accounts: AccountService::new(store.clone()),
            orders: OrderService::new(store.clone(), carts.clone()),
            catalog: CatalogService::new(store),
            carts,
            jwt: JwtService::new(&settings.auth),
            add_guard: AddToCartGuard::new(AddToCartGuardConfig {
                window: Duration::from_millis(settings.cart.add_window_ms),
                capacity: settings.cart.add_guard_capacity,
            }),
        }
    }
}
