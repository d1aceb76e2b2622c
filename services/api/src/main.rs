use std::sync::Arc;

use anyhow::Result;
use api::{
    AppState, create_app,
    settings::{Settings, StoreBackend},
};
use common::database::{DatabaseConfig, health_check, init_pool, run_migrations};
use shop::{
    seed::seed_demo_data,
    store::{InMemoryStore, PostgresStore, Store},
};
use tokio::{net::TcpListener, signal};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

async fn open_store(backend: StoreBackend) -> Result<Arc<dyn Store>> {
    match backend {
        StoreBackend::Postgres => {
            let db_config = DatabaseConfig::from_env()?;
            let pool = init_pool(&db_config).await?;

            if health_check(&pool).await? {
                info!("Database connection successful");
            } else {
                anyhow::bail!("Failed to connect to database");
            }

            run_migrations(&pool, &shop::MIGRATOR).await?;
            Ok(Arc::new(PostgresStore::new(pool)))
        }
        StoreBackend::Memory => {
            warn!("Using the in-memory store, data is lost on restart");
            Ok(Arc::new(InMemoryStore::new()))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting marketplace API");

    let settings = Settings::load()?;
    let store = open_store(settings.store).await?;
    let state = AppState::new(store.clone(), &settings);

    if settings.seed_demo_data {
        seed_demo_data(store.as_ref(), &state.accounts, &state.catalog).await?;
    }

    let app = create_app(state);

    let addr = settings.server.addr();
    let listener = TcpListener::bind(&addr).await?;
    info!("API service listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
