//! Error types for the Xplain services.

use thiserror::Error;

/// Result type alias using the Xplain error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for Xplain services.
///
/// Propagation policy: `Config` is fatal at startup, `Collaborator` is
/// absorbed at the orchestrator boundary and only ever surfaces as a note
/// inside a context bundle, and `SessionNotFound` is the one condition a
/// caller must be able to tell apart from a generic failure.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error (bad provider name, missing key)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Provider rejected our credentials
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Provider rate limit exceeded
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    /// Generic provider failure (network, malformed response, 5xx)
    #[error("Provider error: {0}")]
    Provider(String),

    /// Collaborator failure (repository snapshot, issue lookup)
    #[error("Collaborator error: {0}")]
    Collaborator(String),

    /// Unknown session identifier
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Invalid input or request
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create an error with additional context.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Check if this is an authentication error.
    pub const fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }

    /// Check if this is a rate limit error.
    pub const fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited(_))
    }

    /// Check if this error must be absorbed rather than propagated.
    pub const fn is_collaborator(&self) -> bool {
        matches!(self, Self::Collaborator(_))
    }

    /// Get HTTP status code for this error.
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Auth(_) => 401,
            Self::SessionNotFound(_) => 404,
            Self::InvalidInput(_) => 400,
            Self::RateLimited(_) => 429,
            Self::WithContext { source, .. } => source.status_code(),
            _ => 500,
        }
    }
}

/// Extension trait for adding context to any error type.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_context(context))
    }
}
