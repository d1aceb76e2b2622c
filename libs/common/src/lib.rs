//! Common library for the marketplace
//!
//! This crate provides shared infrastructure used by the marketplace crates:
//! PostgreSQL configuration, pooling, migrations and connectivity checks.
//!
//! ```rust,no_run
//! use common::database::{DatabaseConfig, init_pool, health_check};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DatabaseConfig::from_env()?;
//!     let pool = init_pool(&config).await?;
//!     assert!(health_check(&pool).await?);
//!     Ok(())
//! }
//! ```

pub mod database;
pub mod error;
