//! hostdata-gateway server entry point.
//!
//! Starts the Axum HTTP server over the configured snapshot store.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use hostdata_gateway::api;
use hostdata_gateway::app_state::AppState;
use hostdata_gateway::config::{GatewayConfig, LogFormat, StoreBackend};
use hostdata_gateway::persistence::{MemoryStore, PostgresStore, SnapshotStore};
use hostdata_gateway::service::HistoryService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = GatewayConfig::from_env().map_err(|e| anyhow::anyhow!("{e}"))?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
    tracing::info!(
        addr = %config.listen_addr,
        backend = %config.store_backend,
        "starting hostdata-gateway"
    );

    // Build persistence layer
    let store = open_store(&config).await?;

    // Build service layer
    let history_service = HistoryService::new(store, config.store_timeout());

    // Build router
    let app = api::app(AppState::new(history_service), config.request_timeout());

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}

async fn open_store(config: &GatewayConfig) -> anyhow::Result<Arc<dyn SnapshotStore>> {
    match config.store_backend {
        StoreBackend::Postgres => {
            let store = PostgresStore::connect(config)
                .await
                .context("connecting to PostgreSQL")?;
            if config.run_migrations {
                store.migrate().await.context("running migrations")?;
                tracing::info!("migrations applied");
            }
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            let store = match &config.memory_seed_path {
                Some(path) => {
                    let raw = tokio::fs::read_to_string(path)
                        .await
                        .with_context(|| format!("reading {}", path.display()))?;
                    MemoryStore::from_json(&raw)
                        .with_context(|| format!("parsing {}", path.display()))?
                }
                None => MemoryStore::new(),
            };
            tracing::info!(rows = store.len().await, "memory store ready");
            Ok(Arc::new(store))
        }
    }
}
