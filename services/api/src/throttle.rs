//! Add-to-cart de-duplication
//!
//! Double clicks and client retries tend to fire the same add twice within a
//! few hundred milliseconds. The guard remembers the last accepted add per
//! owner and product and turns a repeat inside the window into a 429.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use shop::models::CartOwner;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

/// Guard configuration
#[derive(Debug, Clone)]
pub struct AddToCartGuardConfig {
    /// Minimum spacing between identical adds
    pub window: Duration,
    /// Maximum number of remembered keys
    pub capacity: usize,
}

impl Default for AddToCartGuardConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_millis(1_000),
            capacity: 10_000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AddToCartGuard {
    config: AddToCartGuardConfig,
    entries: Arc<Mutex<HashMap<String, Instant>>>,
}

impl AddToCartGuard {
    pub fn new(config: AddToCartGuardConfig) -> Self {
        Self {
            config,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Guard key: `<user id or session id>_<product id>`
    pub fn key(owner: &CartOwner, product_id: Uuid) -> String {
        match owner {
            CartOwner::User(user_id) => format!("{user_id}_{product_id}"),
            CartOwner::Guest(session_id) => format!("{session_id}_{product_id}"),
        }
    }

    /// Record an add. Returns false when the same key was accepted within the window.
    pub async fn allow(&self, key: &str) -> bool {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();

        if let Some(last) = entries.get(key) {
            if now.duration_since(*last) < self.config.window {
                debug!(key, "duplicate add rejected");
                return false;
            }
        }

        if entries.len() >= self.config.capacity && !entries.contains_key(key) {
            let window = self.config.window;
            entries.retain(|_, seen| now.duration_since(*seen) < window);

            if entries.len() >= self.config.capacity {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, seen)| **seen)
                    .map(|(k, _)| k.clone());
                if let Some(oldest) = oldest {
                    entries.remove(&oldest);
                }
            }
        }

        entries.insert(key.to_string(), now);
        true
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}
