//! REST API handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::net::Ipv4Addr;
use std::sync::Arc;
use tracing::{info, warn};

use crate::state::AppState;

/// API error response
#[derive(Serialize)]
struct ApiError {
    error: String,
}

impl ApiError {
    fn new(msg: impl Into<String>) -> Self {
        Self { error: msg.into() }
    }
}

/// List all known devices, sorted by address
pub async fn list_devices(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.store.devices().await)
}

/// Get a single device by address
pub async fn get_device(
    State(state): State<Arc<AppState>>,
    Path(addr): Path<String>,
) -> impl IntoResponse {
    let addr: Ipv4Addr = match addr.parse() {
        Ok(addr) => addr,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiError::new("Not an IPv4 address")),
            )
                .into_response()
        }
    };

    match state.store.device(addr).await {
        Some(record) => Json(record).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ApiError::new("Device not found")),
        )
            .into_response(),
    }
}

/// Snapshot history for one device, oldest first
pub async fn get_history(
    State(state): State<Arc<AppState>>,
    Path(addr): Path<String>,
) -> impl IntoResponse {
    let addr: Ipv4Addr = match addr.parse() {
        Ok(addr) => addr,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ApiError::new("Not an IPv4 address")),
            )
                .into_response()
        }
    };

    Json(state.store.history_for(addr).await).into_response()
}

/// Daily statistics, sorted by date
pub async fn get_stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.store.daily_stats().await)
}

/// Scan trigger response
#[derive(Serialize)]
struct ScanResponse {
    status: &'static str,
}

/// Trigger a scan cycle outside the periodic schedule. The cycle gate in
/// the orchestrator keeps it from overlapping a running one.
pub async fn trigger_scan(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    info!("Manual scan requested");
    let orchestrator = state.orchestrator.clone();
    tokio::spawn(async move {
        if let Err(e) = orchestrator.run_once().await {
            warn!(error = %e, "Manual scan failed");
        }
    });

    (StatusCode::ACCEPTED, Json(ScanResponse { status: "scanning" }))
}
