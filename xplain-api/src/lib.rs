//! Xplain API - HTTP service over the chat engine.
//!
//! ## Architecture
//!
//! ```text
//! Client → API (session registry) → ChatEngine → LLM Gateway
//!                                        ↓
//!                          snapshot / issue collaborators
//! ```
//!
//! The gateway is constructed once at startup; an unsupported provider name
//! or missing key aborts before the listener binds, so configuration errors
//! never reach the first chat call.

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod routes;

pub use routes::{build_router, AppState};

use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use xplain_agent::ChatEngine;
use xplain_common::config::Config;
use xplain_gateway::LlmGateway;
use xplain_tools::{GitSnapshotProvider, GithubClient};

/// Build the full application router, constructing the gateway and
/// collaborators from configuration. Fails fast on configuration errors.
pub fn build_app(config: &Config) -> Result<Router, xplain_common::Error> {
    let gateway = LlmGateway::from_config(&config.provider)?;

    let engine = Arc::new(ChatEngine::new(
        gateway,
        Arc::new(GitSnapshotProvider::new()),
        Arc::new(GithubClient::new(&config.github)),
        config,
    ));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Ok(build_router(engine)
        .layer(cors)
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        ))))
}

/// Start the API server.
pub async fn start_server(config: &Config) -> anyhow::Result<()> {
    let addr = SocketAddr::from((
        config.server.bind.parse::<std::net::IpAddr>()?,
        config.server.port,
    ));

    let router = build_app(config)?;

    tracing::info!("Starting Xplain API on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_app_rejects_unknown_provider() {
        let mut config = Config::default();
        config.provider.name = "mistral".into();
        config.provider.api_key = Some("key".into());

        let err = build_app(&config).unwrap_err();
        assert!(matches!(err, xplain_common::Error::Config(_)));
    }

    #[test]
    fn build_app_rejects_missing_key() {
        let mut config = Config::default();
        config.provider.name = "openai".into();
        config.provider.api_key = None;

        assert!(build_app(&config).is_err());
    }

    #[test]
    fn build_app_accepts_valid_config() {
        let mut config = Config::default();
        config.provider.name = "anthropic".into();
        config.provider.api_key = Some("test-key".into());

        assert!(build_app(&config).is_ok());
    }
}
