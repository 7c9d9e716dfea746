//! Handlers for the `/devices` resource.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use gasguard_core::device::NewDevice;
use gasguard_core::error::CoreError;
use gasguard_monitor::DeviceView;

use crate::error::{AppError, AppResult};
use crate::extract::ApiJson;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/devices
///
/// Every registered device in registration order, with presentation fields.
pub async fn list_devices(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<DeviceView>>>> {
    let devices = state.monitor.device_views().await;
    Ok(Json(DataResponse { data: devices }))
}

/// POST /api/v1/devices
///
/// Register a device. Returns 201 with the stored record, or 400 listing
/// every field violation.
pub async fn create_device(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<NewDevice>,
) -> AppResult<impl IntoResponse> {
    let device = state.monitor.add_device(input).await?;
    tracing::info!(device_id = %device.id, name = %device.name, "Device registered via API");
    Ok((StatusCode::CREATED, Json(DataResponse { data: device })))
}

/// GET /api/v1/devices/{id}
pub async fn get_device(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<DataResponse<DeviceView>>> {
    let device = state
        .monitor
        .device_view(&id)
        .await
        .ok_or_else(|| AppError::Core(device_not_found(&id)))?;
    Ok(Json(DataResponse { data: device }))
}

/// DELETE /api/v1/devices/{id}
///
/// Removing an unknown device is a no-op and still returns 204.
pub async fn delete_device(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> StatusCode {
    if state.monitor.remove_device(&id).await {
        tracing::info!(device_id = %id, "Device removed via API");
    }
    StatusCode::NO_CONTENT
}

pub(crate) fn device_not_found(id: &str) -> CoreError {
    CoreError::NotFound {
        entity: "Device",
        id: id.to_string(),
    }
}
