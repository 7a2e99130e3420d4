//! Xplain API - Main entry point.

use anyhow::Result;
use xplain_common::config::Config;
use xplain_common::logging::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::load_with_env()?;

    // Initialize logging
    init_logging(
        &config.observability.log_level,
        &config.observability.log_format,
    );

    tracing::info!("Xplain API v{}", env!("CARGO_PKG_VERSION"));

    // Start the API server
    xplain_api::start_server(&config).await
}
