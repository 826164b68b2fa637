//! Prepare-text API endpoint.
//!
//! Accepts raw pasted content plus optional normalization options and
//! returns the cleaned text, outline, stats, and warnings.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use pastemill_core::{PrepareOptions, PrepareResult, prepare};
use serde::Deserialize;

use crate::error::ServerError;
use crate::state::AppState;

/// Request body for POST /api/prepare-text.
///
/// Unknown fields are rejected so option typos surface as a 400 rather
/// than being silently ignored.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct PrepareRequest {
    /// Raw pasted content.
    text: String,
    /// Normalization options; server defaults apply when omitted.
    options: Option<PrepareOptions>,
}

/// Handle POST /api/prepare-text.
///
/// Any payload problem (wrong shape, non-string text, unknown or
/// out-of-range option) maps to 400 `Invalid request payload`.
pub(crate) async fn prepare_text(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PrepareRequest>, JsonRejection>,
) -> Result<Json<PrepareResult>, ServerError> {
    let Json(request) = payload.map_err(|_| ServerError::InvalidPayload)?;

    let options = request
        .options
        .unwrap_or_else(|| state.default_options.clone());
    let result = prepare(&request.text, &options);

    if state.verbose && !result.warnings.is_empty() {
        for warning in &result.warnings {
            tracing::warn!(warning = %warning, "Prepare warning");
        }
    }

    Ok(Json(result))
}
