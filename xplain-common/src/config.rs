//! Configuration management for Xplain services.
//!
//! All Xplain services share a unified configuration file at `~/.xplain/config.json`.
//!
//! # Configuration Priority
//!
//! 1. Explicit config file values
//! 2. Environment variables (XPLAIN_* prefix, plus provider key vars)
//! 3. Default values
//!
//! # Environment Variable Mapping
//!
//! ## Service
//! - `XPLAIN_PORT` → server.port
//! - `XPLAIN_BIND_ADDRESS` → server.bind
//! - `XPLAIN_LOG_LEVEL` → observability.log_level
//!
//! ## Provider selection
//! - `XPLAIN_PROVIDER` → provider.name
//! - `XPLAIN_MODEL` → provider.model
//!
//! ## API keys
//! - `ANTHROPIC_API_KEY` → provider.api_key (when provider is anthropic)
//! - `OPENAI_API_KEY` → provider.api_key (when provider is openai)
//! - `GEMINI_API_KEY` / `GOOGLE_API_KEY` → provider.api_key (when provider is gemini)
//! - `TOGETHER_API_KEY` → provider.api_key (when provider is together)
//! - `GITHUB_TOKEN` → github.token

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".xplain"),
        |dirs| dirs.home_dir().join(".xplain"),
    )
}

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

// ============================================================================
// Provider Configuration
// ============================================================================

/// LLM provider selection.
///
/// `name` must be one of `gemini`, `openai`, `anthropic`, `together`.
/// Validation happens once, at gateway construction; an unsupported name
/// fails fast before the first chat call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider identifier from the closed set
    #[serde(default = "default_provider_name")]
    pub name: String,

    /// Model override; each provider has its own default
    #[serde(default)]
    pub model: Option<String>,

    /// API key; env vars are the usual source
    #[serde(default)]
    pub api_key: Option<String>,

    /// Custom endpoint (OpenAI-compatible providers only)
    #[serde(default)]
    pub base_url: Option<String>,
}

fn default_provider_name() -> String {
    "openai".into()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: default_provider_name(),
            model: None,
            api_key: None,
            base_url: None,
        }
    }
}

// ============================================================================
// GitHub Configuration
// ============================================================================

/// GitHub issue/PR search client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubConfig {
    /// Personal access token (optional; unauthenticated requests are rate limited hard)
    #[serde(default)]
    pub token: Option<String>,

    /// API base URL (override for GitHub Enterprise)
    #[serde(default = "default_github_api_base")]
    pub api_base: String,

    /// Maximum number of search results folded into a context bundle
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,
}

fn default_github_api_base() -> String {
    "https://api.github.com".into()
}

fn default_search_limit() -> usize {
    10
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_base: default_github_api_base(),
            search_limit: default_search_limit(),
        }
    }
}

// ============================================================================
// Snapshot Configuration
// ============================================================================

/// Bounds on repository snapshot size.
///
/// These caps keep the grounding context from growing without bound when a
/// large repository is loaded.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SnapshotConfig {
    /// Maximum number of files whose contents are included
    #[serde(default = "default_max_files")]
    pub max_files: usize,

    /// Per-file content cap in bytes; longer files are truncated
    #[serde(default = "default_max_bytes_per_file")]
    pub max_bytes_per_file: usize,

    /// Total content budget in bytes across all selected files
    #[serde(default = "default_max_total_bytes")]
    pub max_total_bytes: usize,
}

fn default_max_files() -> usize {
    50
}

fn default_max_bytes_per_file() -> usize {
    16 * 1024
}

fn default_max_total_bytes() -> usize {
    256 * 1024
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            max_files: default_max_files(),
            max_bytes_per_file: default_max_bytes_per_file(),
            max_total_bytes: default_max_total_bytes(),
        }
    }
}

// ============================================================================
// Session Configuration
// ============================================================================

/// Conversation session configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Number of recent turns supplied to the classifier and synthesizer
    #[serde(default = "default_max_history_turns")]
    pub max_history_turns: usize,
}

fn default_max_history_turns() -> usize {
    20
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_history_turns: default_max_history_turns(),
        }
    }
}

// ============================================================================
// Server Configuration
// ============================================================================

/// HTTP service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address. Default: "127.0.0.1" (local only)
    #[serde(default = "default_bind_address")]
    pub bind: String,

    /// Port number
    #[serde(default = "default_port")]
    pub port: u16,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_bind_address() -> String {
    "127.0.0.1".into()
}

fn default_port() -> u16 {
    8000
}

fn default_request_timeout_secs() -> u64 {
    180
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind_address(),
            port: default_port(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

// ============================================================================
// Observability Configuration
// ============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Base log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Output format: "json" or "pretty"
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration for all Xplain services.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub github: GithubConfig,

    #[serde(default)]
    pub snapshot: SnapshotConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from the default path, falling back to defaults
    /// when no config file exists.
    pub fn load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            tracing::debug!("Config file not found, using defaults");
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load configuration from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Load configuration and apply environment overrides.
    pub fn load_with_env() -> Result<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(port) = std::env::var("XPLAIN_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }
        if let Ok(bind) = std::env::var("XPLAIN_BIND_ADDRESS") {
            self.server.bind = bind;
        }
        if let Ok(level) = std::env::var("XPLAIN_LOG_LEVEL") {
            self.observability.log_level = level;
        }
        if let Ok(name) = std::env::var("XPLAIN_PROVIDER") {
            self.provider.name = name;
        }
        if let Ok(model) = std::env::var("XPLAIN_MODEL") {
            self.provider.model = Some(model);
        }
        if self.github.token.is_none() {
            if let Ok(token) = std::env::var("GITHUB_TOKEN") {
                self.github.token = Some(token);
            }
        }
        self.apply_api_key_fallback();
    }

    /// Fill in `provider.api_key` from the env var matching the selected provider.
    fn apply_api_key_fallback(&mut self) {
        if self.provider.api_key.is_some() {
            return;
        }
        let key = match self.provider.name.as_str() {
            "anthropic" => std::env::var("ANTHROPIC_API_KEY").ok(),
            "openai" => std::env::var("OPENAI_API_KEY").ok(),
            "gemini" => std::env::var("GEMINI_API_KEY")
                .or_else(|_| std::env::var("GOOGLE_API_KEY"))
                .ok(),
            "together" => std::env::var("TOGETHER_API_KEY").ok(),
            _ => None,
        };
        self.provider.api_key = key;
    }

    /// Save configuration to the default path.
    pub fn save(&self) -> Result<()> {
        let path = config_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(&path, content)
            .with_context(|| format!("Failed to write config to {}", path.display()))
    }
}
