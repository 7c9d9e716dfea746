use axum::routing::get;
use axum::Router;

use crate::handlers::history;
use crate::state::AppState;

/// Routes mounted at `/history`.
///
/// ```text
/// GET /range   -> get_history_range
/// PUT /range   -> set_history_range
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/range",
        get(history::get_history_range).put(history::set_history_range),
    )
}
