//! HTTP-level provider tests against a mock server.
//!
//! Exercises request shaping and error-kind classification without touching
//! any hosted API.

use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use xplain_gateway::{ChatRequest, CompatibleProvider, GatewayError, Message, OpenAIProvider, Provider};

fn chat_request(model: &str) -> ChatRequest {
    ChatRequest {
        model: model.into(),
        messages: vec![Message::user("What does the parser do?")],
        system: Some("You are a code analysis assistant.".into()),
        max_tokens: Some(256),
        temperature: None,
    }
}

#[tokio::test]
async fn openai_success_roundtrip() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "gpt-4o-mini",
            "choices": [{"message": {"content": "It tokenizes the source."}}],
            "usage": {"prompt_tokens": 20, "completion_tokens": 6, "total_tokens": 26}
        })))
        .mount(&server)
        .await;

    let provider = OpenAIProvider::with_base_url("test-key", server.uri());
    let response = provider.chat(chat_request("gpt-4o-mini")).await.unwrap();

    assert_eq!(response.content, "It tokenizes the source.");
    assert_eq!(response.usage.total_tokens, 26);
    assert_eq!(response.provider, "openai");
}

#[tokio::test]
async fn unauthorized_maps_to_auth_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&server)
        .await;

    let provider = OpenAIProvider::with_base_url("bad-key", server.uri());
    let err = provider.chat(chat_request("gpt-4o-mini")).await.unwrap_err();

    assert!(err.is_auth());
}

#[tokio::test]
async fn too_many_requests_maps_to_rate_limit() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limit reached"))
        .mount(&server)
        .await;

    let provider =
        CompatibleProvider::custom("together", &server.uri(), "key", "meta-llama/test-model");
    let err = provider
        .chat(chat_request("meta-llama/test-model"))
        .await
        .unwrap_err();

    assert!(err.is_rate_limited());
}

#[tokio::test]
async fn server_error_maps_to_generic() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let provider = OpenAIProvider::with_base_url("key", server.uri());
    let err = provider.chat(chat_request("gpt-4o-mini")).await.unwrap_err();

    assert!(matches!(
        err,
        GatewayError::Generic {
            status: Some(502),
            ..
        }
    ));
}

#[tokio::test]
async fn compatible_provider_sends_system_first() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": "ok"}}]
        })))
        .mount(&server)
        .await;

    let provider =
        CompatibleProvider::custom("together", &server.uri(), "key", "meta-llama/test-model");
    let response = provider
        .chat(chat_request("meta-llama/test-model"))
        .await
        .unwrap();
    assert_eq!(response.content, "ok");

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][1]["role"], "user");
}
