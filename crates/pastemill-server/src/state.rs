//! Shared application state.

use pastemill_core::PrepareOptions;

/// State shared across request handlers.
pub(crate) struct AppState {
    /// Default normalization options applied when a request omits them.
    pub default_options: PrepareOptions,
    /// Log pipeline warnings per request.
    pub verbose: bool,
}
