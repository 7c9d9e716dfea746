use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` while any device is offline.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    pub device_count: usize,
    pub offline_devices: usize,
}

/// GET /health -- service health plus a device connectivity summary.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let devices = state.monitor.registry().list_devices().await;
    let offline_devices = devices.iter().filter(|d| d.is_offline()).count();

    let status = if offline_devices == 0 { "ok" } else { "degraded" };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        device_count: devices.len(),
        offline_devices,
    })
}

/// Mount health check routes (root-level, NOT under `/api/v1`).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
