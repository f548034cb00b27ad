//! StreamPulse - Stream Channel Liveness Monitor
//!
//! Probes stream channels against an external streaming engine and republishes
//! their liveness status over a small HTTP API.

mod config;
mod db;
mod status;
mod tasks;
mod web;

use config::ServerConfig;
use db::Store;
use status::{StatusClient, StatusService};
use web::Server;

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("streampulse=info".parse()?))
        .init();

    // Load configuration
    let cfg = ServerConfig::load();
    tracing::info!("Starting StreamPulse on port {}...", cfg.http_port);
    tracing::info!("Using database at {}", cfg.db_path);
    tracing::info!("Streaming engine at {}", cfg.engine_url);

    // Initialize database
    let store = Arc::new(Store::new(&cfg.db_path)?);
    tracing::info!("Database initialized successfully");

    // Wire up the status checking service
    let client = Arc::new(StatusClient::new(&cfg.engine_url, store.clone()));
    let status_service = Arc::new(StatusService::new(store.clone(), client));

    // Start web server
    let server = Server::new(cfg, store, status_service);
    server.start().await?;

    Ok(())
}
