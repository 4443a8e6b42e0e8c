//! JSON response helpers shared by the HTTP handlers.

use std::fmt::Display;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use serde_json::json;

/// 200 OK with `body` as JSON.
pub fn api_success<T: Serialize>(body: T) -> impl IntoResponse {
    (StatusCode::OK, Json(body))
}

/// Error response in the same `{ error, message, status }` shape that
/// [`CastError`](crate::error::CastError) produces.
pub fn api_error(status: StatusCode, code: &str, message: impl Display) -> impl IntoResponse {
    (
        status,
        Json(json!({
            "error": code,
            "message": message.to_string(),
            "status": status.as_u16(),
        })),
    )
}
