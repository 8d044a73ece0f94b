mod api;
mod db;
mod entity;
mod repository;
#[cfg(test)]
mod test_support;

use std::env;
use std::sync::Arc;

use anyhow::Context;
use apgw_grader::{CancellationToken, EventStream, GraderConfig, GradingOrchestrator};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::api::{AppState, create_router};
use crate::repository::{SeaOrmGradingStore, SeaOrmOwnershipCheck};

const DEFAULT_CONFIG_PATH: &str = "grader.toml";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;

    info!("starting apgw server");
    let config_path = env::var("APGW_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    info!(path = %config_path, "loading grader config");
    let config = GraderConfig::from_file(&config_path)
        .with_context(|| format!("failed to load grader config from {config_path}"))?;

    let db = db::init_pool_and_migrate()
        .await
        .context("failed to initialize database")?;
    info!("database ready");

    let orchestrator = GradingOrchestrator::new(
        config,
        Arc::new(SeaOrmGradingStore::new(db.clone())),
        Arc::new(SeaOrmOwnershipCheck::new(db)),
    )
    .context("failed to initialize grading orchestrator")?;

    let purged = orchestrator
        .workspaces()
        .purge_stale()
        .await
        .context("failed to purge stale workspaces")?;
    if purged > 0 {
        warn!(count = purged, "removed workspaces left by a previous run");
    }

    tokio::spawn(log_events(orchestrator.subscribe_events()));

    let shutdown = CancellationToken::new();
    let state = Arc::new(AppState::new(Arc::new(orchestrator), shutdown.clone()));
    let app = create_router(state).layer(CorsLayer::permissive());

    let bind_addr = env::var("APGW_BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    info!(addr = %bind_addr, "server is ready, press Ctrl+C to shut down");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = %err, "failed to listen for shutdown signal");
            }
            info!("shutdown signal received, cancelling in-flight grading");
            shutdown.cancel();
        })
        .await
        .context("server error")?;

    info!("server shutdown complete");
    Ok(())
}

async fn log_events(mut event_stream: EventStream) {
    loop {
        match event_stream.recv().await {
            Ok(event) => info!(?event, "grading event"),
            Err(err) => {
                warn!(error = %err, "failed to receive grading event");
                break;
            }
        }
    }
}

fn init_tracing() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;

    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    Ok(())
}
