use axum::routing::{get, post};
use axum::Router;

use crate::handlers::alerts;
use crate::state::AppState;

/// Routes mounted at `/alert-config`.
///
/// ```text
/// GET  /        -> get_alert_config
/// PUT  /        -> update_alert_config
/// POST /reset   -> reset_alert_config
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(alerts::get_alert_config).put(alerts::update_alert_config),
        )
        .route("/reset", post(alerts::reset_alert_config))
}
