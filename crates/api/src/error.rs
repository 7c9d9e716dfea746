use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use gasguard_core::error::CoreError;
use serde_json::json;

/// Error type returned by every handler and extractor.
///
/// Domain failures come through [`CoreError`]; malformed bodies and query
/// strings are caught by the extractors in [`crate::extract`] and arrive as
/// `BadRequest`. Every variant renders as `{ "error", "code" }`; field
/// validation failures also carry the full `violations` list.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(CoreError::NotFound { entity, id }) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("{entity} with id {id} not found"),
            ),
            AppError::Core(core @ CoreError::Validation(_)) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", core.to_string())
            }
            AppError::BadRequest(msg) => {
                tracing::debug!(error = %msg, "Rejected malformed request");
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone())
            }
        };

        let mut body = json!({
            "error": message,
            "code": code,
        });
        if let AppError::Core(core) = &self {
            let violations = core.violations();
            if !violations.is_empty() {
                body["violations"] = json!(violations);
            }
        }

        (status, axum::Json(body)).into_response()
    }
}
