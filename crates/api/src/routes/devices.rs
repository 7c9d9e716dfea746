use axum::routing::get;
use axum::Router;

use crate::handlers::{devices, history};
use crate::state::AppState;

/// Routes mounted at `/devices`.
///
/// ```text
/// GET    /                  -> list_devices
/// POST   /                  -> create_device
/// GET    /{id}              -> get_device
/// DELETE /{id}              -> delete_device
/// GET    /{id}/history      -> get_device_history
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(devices::list_devices).post(devices::create_device))
        .route(
            "/{id}",
            get(devices::get_device).delete(devices::delete_device),
        )
        .route("/{id}/history", get(history::get_device_history))
}
