//! Web server module.

mod handlers;

pub use handlers::*;

use crate::config::ServerConfig;
use crate::db::Store;
use crate::status::StatusService;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: ServerConfig,
    pub store: Arc<Store>,
    pub status: Arc<StatusService>,
}

/// Web server for StreamPulse.
pub struct Server {
    state: AppState,
}

impl Server {
    /// Create a new server with the given dependencies.
    pub fn new(config: ServerConfig, store: Arc<Store>, status: Arc<StatusService>) -> Self {
        Self {
            state: AppState {
                config,
                store,
                status,
            },
        }
    }

    /// Build the router with all routes.
    fn routes(&self) -> Router {
        let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any);

        Router::new()
            // Channel management
            .route("/api/channels", get(handlers::handle_get_channels))
            .route("/api/channels", post(handlers::handle_create_channel))
            .route("/api/channels/{id}", delete(handlers::handle_delete_channel))
            // Status checking
            .route(
                "/api/channels/status_summary",
                get(handlers::handle_status_summary),
            )
            .route(
                "/api/channels/check_status",
                post(handlers::handle_check_status_all),
            )
            .route(
                "/api/channels/{id}/check_status",
                post(handlers::handle_check_status_one),
            )
            .layer(cors)
            .layer(DefaultBodyLimit::max(1024 * 1024)) // 1MB
            .with_state(self.state.clone())
    }

    /// Start the server on the configured port.
    pub async fn start(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.state.config.http_port));
        let router = self.routes();

        tracing::info!("Web server listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, router).await?;

        Ok(())
    }
}
