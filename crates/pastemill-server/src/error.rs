//! Error types for the HTTP server.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Server error type.
///
/// Both variants map to HTTP 400 with a JSON `error` body, matching the
/// API contract: malformed payloads and unexpected internal failures
/// are caller-visible errors, never 5xx.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Request body was not a valid prepare request.
    #[error("Invalid request payload")]
    InvalidPayload,

    /// Unexpected internal failure.
    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let body = json!({ "error": self.to_string() });
        (StatusCode::BAD_REQUEST, axum::Json(body)).into_response()
    }
}
