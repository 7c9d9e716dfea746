//! Request extractors whose rejections render through [`AppError`].
//!
//! axum's own `Json` and `Query` answer a bad body or an unknown `range` with
//! a plain-text response; these wrappers keep every failure in the
//! `{ "error", "code" }` envelope.

use axum::extract::{FromRequest, FromRequestParts};

use crate::error::AppError;

/// JSON request body. Malformed or mistyped bodies become `BAD_REQUEST`.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Query string. Unknown metrics or ranges become `BAD_REQUEST`.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);
