//! Web server setup and routing

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::info;

use crate::api;
use crate::state::AppState;
use crate::ws;

/// Run the web server until the process exits
pub async fn run(state: Arc<AppState>, bind: &str) -> Result<()> {
    let app = Router::new()
        // API routes
        .route("/api/devices", get(api::list_devices))
        .route("/api/devices/{addr}", get(api::get_device))
        .route("/api/devices/{addr}/history", get(api::get_history))
        .route("/api/stats", get(api::get_stats))
        .route("/api/scan", post(api::trigger_scan))
        // WebSocket for real-time updates
        .route("/ws", get(ws::websocket_handler))
        // Static files (frontend)
        .fallback_service(ServeDir::new("web"))
        // CORS
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        // State
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(address = %bind, "Starting web server");
    axum::serve(listener, app).await?;
    Ok(())
}
