mod config;
mod db;
mod errors;
mod metrics;
mod regen;
mod seed;
mod server;
mod state;
mod store;
mod wire;

use crate::config::{AppConfig, StorageBackend};
use crate::errors::DashboardResult;
use crate::metrics::timeseries::month_start;
use crate::state::AppState;
use crate::store::{MemoryStore, MetricsStore};
use std::sync::Arc;

fn build_store(cfg: &AppConfig) -> DashboardResult<Arc<dyn MetricsStore>> {
    match cfg.storage_backend {
        StorageBackend::Sqlite => Ok(Arc::new(db::SqliteStore::open(&cfg.data_dir)?)),
        StorageBackend::Memory => Ok(Arc::new(MemoryStore::new())),
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("custody dashboard starting");

    let cfg = match AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("config error: {e}");
            std::process::exit(1);
        }
    };

    let store = match build_store(&cfg) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("storage init error: {e}");
            std::process::exit(1);
        }
    };
    tracing::info!("storage backend: {}", store.backend_name());

    let port = cfg.server_port;
    let seed_on_start = cfg.seed_on_start;
    let seed_rng = regen::seeded_rng(cfg.regen_seed);
    let app_state = AppState::new(cfg, store);

    if seed_on_start {
        let end_month = month_start(chrono::Utc::now().date_naive());
        let mut rng = seed_rng;
        if let Err(e) = seed::seed_if_empty(
            app_state.store.as_ref(),
            end_month,
            app_state.regenerator.generator(),
            &mut rng,
        ) {
            tracing::error!("seeding failed: {e}");
            std::process::exit(1);
        }
    }

    let app = match server::router(app_state) {
        Ok(r) => r,
        Err(e) => {
            tracing::error!("router error: {e}");
            std::process::exit(1);
        }
    };

    let addr = format!("0.0.0.0:{port}");
    tracing::info!("server listening on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("bind error: {e}");
            std::process::exit(1);
        });

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("server error: {e}");
    }
}
