//! Service settings
//!
//! Layered with the `config` crate: built-in defaults, then an optional
//! `config/market.{toml,yaml,json}` file, then `MARKET_*` environment
//! variables using `__` between nested keys, e.g. `MARKET_AUTH__JWT_SECRET`
//! or `MARKET_CART__MERGE_POLICY=keep_larger`.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use shop::models::MergePolicy;

/// HTTP listener
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl ServerSettings {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Token signing
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    pub jwt_secret: String,
    pub token_expiry_seconds: u64,
}

/// Cart behaviour
#[derive(Debug, Clone, Deserialize)]
pub struct CartSettings {
    pub merge_policy: MergePolicy,
    /// Repeated identical adds inside this window are rejected
    pub add_window_ms: u64,
    pub add_guard_capacity: usize,
}

/// Storage backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub auth: AuthSettings,
    pub cart: CartSettings,
    pub store: StoreBackend,
    pub seed_demo_data: bool,
}

impl Settings {
    /// Load settings from defaults, the optional config file and the environment
    pub fn load() -> Result<Self, ConfigError> {
        let settings: Settings = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("auth.token_expiry_seconds", 86_400)?
            .set_default("cart.merge_policy", "sum")?
            .set_default("cart.add_window_ms", 1_000)?
            .set_default("cart.add_guard_capacity", 10_000)?
            .set_default("store", "postgres")?
            .set_default("seed_demo_data", false)?
            .add_source(File::with_name("config/market").required(false))
            .add_source(
                Environment::with_prefix("MARKET")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        if settings.auth.jwt_secret.trim().is_empty() {
            return Err(ConfigError::Message("auth.jwt_secret must not be empty".into()));
        }

        Ok(settings)
    }
}
