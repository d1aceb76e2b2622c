//! Marketplace domain core
//!
//! Carts for guests and signed-in users, order placement with atomic stock
//! decrements, the product catalog and user accounts. Everything persists
//! through the [`store::Store`] trait; [`store::PostgresStore`] is the
//! production backend and [`store::InMemoryStore`] backs tests.

use sqlx::migrate::Migrator;

pub mod accounts;
pub mod cart;
pub mod catalog;
pub mod error;
pub mod models;
pub mod orders;
pub mod seed;
pub mod store;
pub mod validation;

pub use accounts::AccountService;
pub use cart::CartService;
pub use catalog::CatalogService;
pub use error::{Result, ShopError};
pub use orders::OrderService;

/// Schema migrations for [`store::PostgresStore`]
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");
