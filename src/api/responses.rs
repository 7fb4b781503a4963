//! Shared API response envelope
//!
//! Every endpoint answers `{"success": ..., "results": ...}` with HTTP 200;
//! failures are flagged in the body rather than the status code. `results`
//! is omitted entirely when a handler has nothing to report.

use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub results: Value,
}

/// Success with a payload.
pub fn ok<T: Serialize>(results: T) -> Response {
    let results = serde_json::to_value(results).unwrap_or(Value::Null);
    Json(ApiResponse {
        success: true,
        results,
    })
    .into_response()
}

/// Bare `{"success": true}`.
pub fn ok_empty() -> Response {
    Json(ApiResponse {
        success: true,
        results: Value::Null,
    })
    .into_response()
}

/// Failure with a payload.
pub fn failure<T: Serialize>(results: T) -> Response {
    let results = serde_json::to_value(results).unwrap_or(Value::Null);
    Json(ApiResponse {
        success: false,
        results,
    })
    .into_response()
}

pub fn db_error() -> Response {
    failure(json!({"error": "Database error."}))
}

pub fn session_expired() -> Response {
    failure("Session Expired.")
}
