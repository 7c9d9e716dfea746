//! Handlers for the live alert configuration.
//!
//! A rejected edit leaves the committed configuration untouched; the
//! response lists every violated field.

use axum::extract::State;
use axum::Json;
use gasguard_core::alert_config::AlertConfig;

use crate::error::AppResult;
use crate::extract::ApiJson;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/alert-config
pub async fn get_alert_config(State(state): State<AppState>) -> Json<DataResponse<AlertConfig>> {
    let cfg = state.monitor.alert_config();
    Json(DataResponse {
        data: cfg.as_ref().clone(),
    })
}

/// PUT /api/v1/alert-config
///
/// Validate and commit a full configuration. Reachable devices are
/// re-classified against the new thresholds straight away.
///
/// A contact field must be filled exactly when its channel is enabled:
/// switching email or SMS off without clearing `email_address` or
/// `phone_number` is rejected with a `VALIDATION_ERROR`.
pub async fn update_alert_config(
    State(state): State<AppState>,
    ApiJson(draft): ApiJson<AlertConfig>,
) -> AppResult<Json<DataResponse<AlertConfig>>> {
    let cfg = state.monitor.commit_config(draft).await?;
    Ok(Json(DataResponse {
        data: cfg.as_ref().clone(),
    }))
}

/// POST /api/v1/alert-config/reset
pub async fn reset_alert_config(
    State(state): State<AppState>,
) -> Json<DataResponse<AlertConfig>> {
    let cfg = state.monitor.reset_config().await;
    Json(DataResponse {
        data: cfg.as_ref().clone(),
    })
}
