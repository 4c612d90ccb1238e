//! Snowfinch web
//!
//! Serves the site and sensor management pages.

use std::sync::Arc;

use anyhow::Result;
use snowfinch_web::{
    config::{self, StoreBackend},
    db::{Database, MemorySensorStore, SensorStore},
    http,
    state::AppState,
};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEMO_SITE: &str = "Snowfinch";

async fn open_store(config: &config::Config) -> Result<Arc<dyn SensorStore>> {
    match config.store {
        StoreBackend::Memory => {
            info!("Using in-memory sensor store");
            Ok(Arc::new(MemorySensorStore::new()))
        }
        StoreBackend::Postgres => {
            let db = match Database::connect(&config.database).await {
                Ok(db) => {
                    info!("Database connection established");
                    db
                }
                Err(e) => {
                    error!(error = %e, "Failed to connect to database");
                    return Err(e.into());
                }
            };

            // Run migrations in dev mode
            if config.dev_mode {
                info!("Running database migrations (dev mode)");
                if let Err(e) = db.run_migrations().await {
                    error!(error = %e, "Failed to run migrations");
                    return Err(e.into());
                }
            }

            Ok(Arc::new(db.sensor_store()))
        }
    }
}

/// Gives a fresh dev environment a site to work with.
async fn seed_demo_site(store: &dyn SensorStore) -> Result<()> {
    if store.list_sites().await?.is_empty() {
        let site = store.insert_site(DEMO_SITE).await?;
        info!(site_id = %site.id, "Seeded demo site");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = config::Config::from_env()?;

    // Initialize tracing (prefer RUST_LOG, fallback to SNOWFINCH_LOG_LEVEL)
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_level.clone().into()))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting snowfinch web");
    info!(listen_addr = %config.listen_addr, store = ?config.store, "Configuration loaded");

    let store = open_store(&config).await?;
    if config.dev_mode || config.store == StoreBackend::Memory {
        seed_demo_site(store.as_ref()).await?;
    }

    let state = AppState::new(store);
    let app = http::create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!(addr = %config.listen_addr, "Listening for connections");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for shutdown signal");
            }
            info!("Received shutdown signal");
        })
        .await?;

    info!("Snowfinch web shutdown complete");
    Ok(())
}
