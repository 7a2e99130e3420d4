//! Xplain Common - Shared types, utilities, and configuration for the Xplain services.
//!
//! This crate provides:
//! - Configuration types and loading
//! - Error types and handling utilities
//! - Logging setup and structured logging helpers

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod logging;

pub use config::{
    Config, GithubConfig, ObservabilityConfig, ProviderConfig, ServerConfig, SessionConfig,
    SnapshotConfig,
};
pub use error::{Error, Result};

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::config::{Config, GithubConfig, ProviderConfig, SnapshotConfig};
    pub use crate::error::{Error, Result};
    pub use crate::logging::init_logging;
}
