//! Handlers for bucketed device history and the selected range.

use axum::extract::{Path, State};
use axum::Json;
use gasguard_core::history::{Bucket, HistoryRange, Metric};
use gasguard_core::types::DeviceId;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::extract::{ApiJson, ApiQuery};
use crate::handlers::devices::device_not_found;
use crate::response::DataResponse;
use crate::state::AppState;

/// Query parameters for the device history endpoint.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Defaults to gas level.
    pub metric: Option<Metric>,
    /// Defaults to the currently selected range.
    pub range: Option<HistoryRange>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub device_id: DeviceId,
    pub metric: Metric,
    pub range: HistoryRange,
    pub buckets: Vec<Bucket>,
}

/// Body and response of the range selection endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct RangeSelection {
    pub range: HistoryRange,
}

/// GET /api/v1/devices/{id}/history?metric=gas_level&range=1h
///
/// Always returns the full bucket array for the range; empty buckets carry
/// a `null` value.
pub async fn get_device_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiQuery(params): ApiQuery<HistoryQuery>,
) -> AppResult<Json<DataResponse<HistoryResponse>>> {
    let metric = params.metric.unwrap_or_default();
    let range = match params.range {
        Some(range) => range,
        None => state.monitor.selected_history_range().await,
    };

    let buckets = state
        .monitor
        .history(&id, metric, range)
        .await
        .ok_or_else(|| AppError::Core(device_not_found(&id)))?;

    Ok(Json(DataResponse {
        data: HistoryResponse {
            device_id: id,
            metric,
            range,
            buckets,
        },
    }))
}

/// GET /api/v1/history/range
pub async fn get_history_range(
    State(state): State<AppState>,
) -> Json<DataResponse<RangeSelection>> {
    let range = state.monitor.selected_history_range().await;
    Json(DataResponse {
        data: RangeSelection { range },
    })
}

/// PUT /api/v1/history/range
///
/// Selecting a range discards that range's buckets for every device and
/// starts a fresh window ending now.
pub async fn set_history_range(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RangeSelection>,
) -> Json<DataResponse<RangeSelection>> {
    state.monitor.set_history_range(body.range).await;
    Json(DataResponse {
        data: RangeSelection { range: body.range },
    })
}
