//! Xplain Gateway - uniform chat interface over multiple hosted LLM providers.
//!
//! Configuration selects exactly one provider from the closed set
//! {`gemini`, `openai`, `anthropic`, `together`} at construction time.
//! Unsupported identifiers and missing API keys fail fast with a
//! configuration error, never at call time, and the chosen provider is
//! never re-branched per call.

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod provider;

pub use provider::{
    AnthropicProvider, ChatRequest, ChatResponse, CompatibleProvider, GatewayError,
    GeminiProvider, Message, OpenAIProvider, Provider, TokenUsage,
};

use std::sync::Arc;
use xplain_common::config::ProviderConfig;
use xplain_common::Error;

/// The LLM gateway: one provider, selected once, behind a uniform
/// `complete` operation.
#[derive(Clone)]
pub struct LlmGateway {
    provider: Arc<dyn Provider>,
    model: Option<String>,
}

impl std::fmt::Debug for LlmGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmGateway")
            .field("provider", &self.provider.name())
            .field("model", &self.model)
            .finish()
    }
}

impl LlmGateway {
    /// Build a gateway from configuration.
    ///
    /// Fails with [`Error::Config`] when the provider name is not in the
    /// closed set or no API key is available for it.
    pub fn from_config(config: &ProviderConfig) -> Result<Self, Error> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            Error::Config(format!(
                "No API key configured for provider '{}'",
                config.name
            ))
        })?;

        let provider: Arc<dyn Provider> = match config.name.as_str() {
            "anthropic" => match &config.base_url {
                Some(base) => Arc::new(AnthropicProvider::with_base_url(api_key, base)),
                None => Arc::new(AnthropicProvider::new(api_key)),
            },
            "openai" => match &config.base_url {
                Some(base) => Arc::new(OpenAIProvider::with_base_url(api_key, base)),
                None => Arc::new(OpenAIProvider::new(api_key)),
            },
            "gemini" => match &config.base_url {
                Some(base) => Arc::new(GeminiProvider::with_base_url(api_key, base)),
                None => Arc::new(GeminiProvider::new(api_key)),
            },
            "together" => Arc::new(CompatibleProvider::together(api_key)),
            other => {
                return Err(Error::Config(format!(
                    "Unsupported provider '{other}' (expected one of: gemini, openai, anthropic, together)"
                )));
            }
        };

        tracing::info!(provider = provider.name(), "LLM gateway configured");

        Ok(Self {
            provider,
            model: config.model.clone(),
        })
    }

    /// Build a gateway around an existing provider implementation.
    ///
    /// Used by tests and anywhere a hand-rolled provider needs to stand in
    /// for a hosted one.
    pub fn from_provider(provider: Arc<dyn Provider>, model: Option<String>) -> Self {
        Self { provider, model }
    }

    /// Name of the selected provider.
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Send an ordered list of role-tagged messages and return the
    /// generated text.
    pub async fn complete(
        &self,
        messages: Vec<Message>,
        system: Option<String>,
        model_override: Option<&str>,
    ) -> Result<String, GatewayError> {
        let model = model_override
            .map(String::from)
            .or_else(|| self.model.clone())
            .unwrap_or_else(|| self.provider.default_model().to_string());

        let request = ChatRequest {
            model,
            messages,
            system,
            max_tokens: None,
            temperature: None,
        };

        let response = self.provider.chat(request).await?;

        tracing::debug!(
            provider = %response.provider,
            model = %response.model,
            latency_ms = response.latency_ms,
            total_tokens = response.usage.total_tokens,
            "Chat completion"
        );

        Ok(response.content)
    }
}
