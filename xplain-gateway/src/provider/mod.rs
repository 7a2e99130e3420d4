//! Multi-provider abstraction for LLM APIs.
//!
//! Provides a unified interface for calling different LLM providers
//! (Anthropic, OpenAI, Gemini, Together) with consistent request/response
//! formats. Each provider module handles its own wire format; everything
//! above this layer sees only [`ChatRequest`] and [`ChatResponse`].

mod anthropic;
mod compatible;
mod gemini;
mod openai;

pub use anthropic::AnthropicProvider;
pub use compatible::CompatibleProvider;
pub use gemini::GeminiProvider;
pub use openai::OpenAIProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Provider Trait
// ============================================================================

/// Unified interface for LLM providers.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Get the provider name.
    fn name(&self) -> &str;

    /// Model used when the request carries no override.
    fn default_model(&self) -> &str;

    /// Send a chat completion request.
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, GatewayError>;
}

// ============================================================================
// Errors
// ============================================================================

/// Error from a provider call, split into the three kinds the rest of the
/// system reacts to differently: auth failures abort startup-level calls,
/// rate limits and generic failures degrade the current turn.
#[derive(Error, Debug, Clone)]
pub enum GatewayError {
    /// Credentials rejected (401/403)
    #[error("[{provider}] authentication failed: {message}")]
    Auth { provider: String, message: String },

    /// Rate limit exceeded (429)
    #[error("[{provider}] rate limited: {message}")]
    RateLimited { provider: String, message: String },

    /// Anything else: transport failure, malformed response, 5xx
    #[error("[{provider}] request failed: {message}")]
    Generic {
        provider: String,
        message: String,
        status: Option<u16>,
    },
}

impl GatewayError {
    /// Classify an HTTP error status into an error kind.
    pub fn from_status(provider: &str, status: u16, body: String) -> Self {
        match status {
            401 | 403 => Self::Auth {
                provider: provider.to_string(),
                message: body,
            },
            429 => Self::RateLimited {
                provider: provider.to_string(),
                message: body,
            },
            _ => Self::Generic {
                provider: provider.to_string(),
                message: body,
                status: Some(status),
            },
        }
    }

    /// Wrap a transport-level failure (connect, timeout, TLS).
    pub fn transport(provider: &str, err: &reqwest::Error) -> Self {
        Self::Generic {
            provider: provider.to_string(),
            message: format!("Request failed: {}", err),
            status: None,
        }
    }

    /// Wrap a response the provider returned but we could not parse.
    pub fn malformed(provider: &str, err: &reqwest::Error) -> Self {
        Self::Generic {
            provider: provider.to_string(),
            message: format!("Failed to parse response: {}", err),
            status: None,
        }
    }

    /// Check if this is an authentication error.
    pub const fn is_auth(&self) -> bool {
        matches!(self, Self::Auth { .. })
    }

    /// Check if this is a rate limit error.
    pub const fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

impl From<GatewayError> for xplain_common::Error {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Auth { .. } => Self::Auth(err.to_string()),
            GatewayError::RateLimited { .. } => Self::RateLimited(err.to_string()),
            GatewayError::Generic { .. } => Self::Provider(err.to_string()),
        }
    }
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Unified chat request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Model to use
    pub model: String,
    /// Messages in the conversation
    pub messages: Vec<Message>,
    /// System prompt (if not in messages)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<i64>,
    /// Temperature (0.0 - 1.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

/// A role-tagged message in the conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".into(),
            content: content.into(),
        }
    }
}

/// Unified chat response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Provider name
    pub provider: String,
    /// Model used
    pub model: String,
    /// Response content
    pub content: String,
    /// Token usage
    pub usage: TokenUsage,
    /// Response latency in milliseconds
    pub latency_ms: u64,
}

/// Token usage information.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub total_tokens: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(GatewayError::from_status("openai", 401, "bad key".into()).is_auth());
        assert!(GatewayError::from_status("openai", 403, "forbidden".into()).is_auth());
        assert!(GatewayError::from_status("openai", 429, "slow down".into()).is_rate_limited());

        let generic = GatewayError::from_status("openai", 500, "boom".into());
        assert!(!generic.is_auth());
        assert!(!generic.is_rate_limited());
        assert!(matches!(
            generic,
            GatewayError::Generic {
                status: Some(500),
                ..
            }
        ));
    }

    #[test]
    fn test_error_conversion_preserves_kind() {
        let auth: xplain_common::Error =
            GatewayError::from_status("gemini", 401, "nope".into()).into();
        assert!(auth.is_auth());

        let limited: xplain_common::Error =
            GatewayError::from_status("gemini", 429, "later".into()).into();
        assert!(limited.is_rate_limited());

        let generic: xplain_common::Error =
            GatewayError::from_status("gemini", 502, "bad gateway".into()).into();
        assert!(matches!(generic, xplain_common::Error::Provider(_)));
    }

    #[test]
    fn test_chat_request_serialization() {
        let request = ChatRequest {
            model: "gpt-4o-mini".into(),
            messages: vec![Message::user("Hello")],
            system: Some("You are helpful.".into()),
            max_tokens: Some(1000),
            temperature: None,
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("gpt-4o-mini"));
        assert!(json.contains("Hello"));
        assert!(!json.contains("temperature"));
    }

    #[test]
    fn test_message_constructors() {
        assert_eq!(Message::user("hi").role, "user");
        assert_eq!(Message::assistant("hello").role, "assistant");
    }
}
