//! HTTP server for the pastemill text-preparation engine.
//!
//! Exposes a single JSON endpoint:
//!
//! - `POST /api/prepare-text` with body `{ "text": string, "options"?:
//!   {...} }` → [`pastemill_core::PrepareResult`] as JSON, or HTTP 400
//!   `{ "error": string }` on an invalid payload.
//!
//! The pipeline itself is synchronous and CPU-bound; requests are
//! independent, so axum's default per-connection concurrency is all the
//! parallelism needed.
//!
//! # Quick Start
//!
//! ```ignore
//! use pastemill_server::{ServerConfig, run_server};
//!
//! #[tokio::main]
//! async fn main() {
//!     run_server(ServerConfig::default()).await.unwrap();
//! }
//! ```

mod app;
mod error;
mod handlers;
mod state;

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use pastemill_core::PrepareOptions;
use state::AppState;

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Default normalization options for requests without options.
    pub default_options: PrepareOptions,
    /// Log per-request pipeline warnings.
    pub verbose: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 7878,
            default_options: PrepareOptions::default(),
            verbose: false,
        }
    }
}

/// Run the server.
///
/// # Errors
///
/// Returns an error if the address is invalid or binding fails.
pub async fn run_server(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let state = Arc::new(AppState {
        default_options: config.default_options,
        verbose: config.verbose,
    });

    let app = app::create_router(state);

    let addr = SocketAddr::from_str(&format!("{}:{}", config.host, config.port))?;
    tracing::info!(address = %addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Wait for shutdown signal (Ctrl-C).
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received, stopping server...");
}

/// Create server configuration from a pastemill config file.
#[must_use]
pub fn server_config_from_config(config: &pastemill_config::Config, verbose: bool) -> ServerConfig {
    ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
        default_options: config.prepare.to_options(),
        verbose,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use tower::ServiceExt;

    use super::*;

    fn test_router() -> axum::Router {
        app::create_router(Arc::new(AppState {
            default_options: PrepareOptions::default(),
            verbose: false,
        }))
    }

    fn json_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/prepare-text")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_owned()))
            .expect("request builds")
    }

    async fn response_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body reads");
        serde_json::from_slice(&bytes).expect("body is JSON")
    }

    #[tokio::test]
    async fn test_prepare_text_success() {
        let response = test_router()
            .oneshot(json_request(r##"{"text": "# Title\n\nBody."}"##))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = response_json(response).await;
        assert_eq!(json["outline"][0], "Title");
        assert!(json["cleanedText"].as_str().unwrap().contains("# Title"));
        assert!(json["stats"]["chars"].as_u64().unwrap() > 0);
    }

    #[tokio::test]
    async fn test_prepare_text_with_options() {
        let body = r#"{"text": "| K | V |\n| --- | --- |\n| Owner | Team A |", "options": {"tableMode": "kv"}}"#;
        let response = test_router().oneshot(json_request(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = response_json(response).await;
        assert!(
            json["cleanedText"]
                .as_str()
                .unwrap()
                .contains("Owner: Team A")
        );
    }

    #[tokio::test]
    async fn test_invalid_payload_is_400() {
        let response = test_router()
            .oneshot(json_request(r#"{"text": 42}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = response_json(response).await;
        assert_eq!(json["error"], "Invalid request payload");
    }

    #[tokio::test]
    async fn test_malformed_json_is_400() {
        let response = test_router()
            .oneshot(json_request("not json at all"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_option_is_400() {
        let body = r#"{"text": "x", "options": {"tableMoode": "kv"}}"#;
        let response = test_router().oneshot(json_request(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
