pub mod alerts;
pub mod devices;
pub mod health;
pub mod history;

use axum::routing::get;
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /ws                                 WebSocket live event feed
///
/// /devices                            list, register
/// /devices/{id}                       get, remove
/// /devices/{id}/history               bucketed history (?metric=&range=)
///
/// /alert-config                       get, replace (PUT)
/// /alert-config/reset                 restore defaults (POST)
///
/// /history/range                      select + rebuild range (PUT)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ws", get(handlers::ws::ws_handler))
        .nest("/devices", devices::router())
        .nest("/alert-config", alerts::router())
        .nest("/history", history::router())
}
