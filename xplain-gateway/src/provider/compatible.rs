//! Generic OpenAI-compatible provider.
//!
//! Most hosted LLM APIs follow the same `/v1/chat/completions` format. This
//! module provides a single implementation that works for all of them; the
//! `together` constructor is the one wired into gateway construction, and
//! `custom` covers any other compatible endpoint via `provider.base_url`.

use super::{ChatRequest, ChatResponse, GatewayError, Provider, TokenUsage};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// A provider that speaks the OpenAI-compatible chat completions API.
pub struct CompatibleProvider {
    name: String,
    base_url: String,
    api_key: String,
    default_model: String,
    client: Client,
}

impl CompatibleProvider {
    /// Create a new OpenAI-compatible provider.
    pub fn new(
        name: &str,
        base_url: &str,
        api_key: impl Into<String>,
        default_model: &str,
    ) -> Self {
        Self {
            name: name.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            default_model: default_model.to_string(),
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .connect_timeout(std::time::Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    /// Create Together AI provider.
    pub fn together(api_key: impl Into<String>) -> Self {
        Self::new(
            "together",
            "https://api.together.xyz",
            api_key,
            "meta-llama/Llama-3.3-70B-Instruct-Turbo",
        )
    }

    /// Create a custom provider with any OpenAI-compatible endpoint.
    pub fn custom(name: &str, base_url: &str, api_key: impl Into<String>, model: &str) -> Self {
        Self::new(name, base_url, api_key, model)
    }
}

#[async_trait]
impl Provider for CompatibleProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, GatewayError> {
        let start = Instant::now();

        let mut messages: Vec<CompatibleMessage> = Vec::new();

        if let Some(ref system) = request.system {
            messages.push(CompatibleMessage {
                role: "system".to_string(),
                content: system.clone(),
            });
        }

        for msg in &request.messages {
            messages.push(CompatibleMessage {
                role: msg.role.clone(),
                content: msg.content.clone(),
            });
        }

        let compatible_request = CompatibleRequest {
            model: request.model.clone(),
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let url = format!("{}/v1/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&compatible_request)
            .send()
            .await
            .map_err(|e| GatewayError::transport(&self.name, &e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(GatewayError::from_status(
                &self.name,
                status.as_u16(),
                error_text,
            ));
        }

        let result: CompatibleResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::malformed(&self.name, &e))?;

        let choice = result
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| GatewayError::Generic {
                provider: self.name.clone(),
                message: format!("No response from {}", self.name),
                status: None,
            })?;

        let usage = result.usage.map_or(TokenUsage::default(), |u| TokenUsage {
            input_tokens: u.prompt_tokens.unwrap_or(0),
            output_tokens: u.completion_tokens.unwrap_or(0),
            total_tokens: u.total_tokens.unwrap_or(0),
        });

        Ok(ChatResponse {
            provider: self.name.clone(),
            model: request.model,
            content: choice.message.content,
            usage,
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Serialize)]
struct CompatibleRequest {
    model: String,
    messages: Vec<CompatibleMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<i64>,
}

#[derive(Debug, Serialize)]
struct CompatibleMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct CompatibleResponse {
    choices: Vec<CompatibleChoice>,
    #[serde(default)]
    usage: Option<CompatibleUsage>,
}

#[derive(Debug, Deserialize)]
struct CompatibleChoice {
    message: CompatibleResponseMessage,
}

#[derive(Debug, Deserialize)]
struct CompatibleResponseMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct CompatibleUsage {
    prompt_tokens: Option<i64>,
    completion_tokens: Option<i64>,
    total_tokens: Option<i64>,
}
