//! Route definitions for the Xplain API.
//!
//! Caller-facing operations over the chat engine: load a repository, send a
//! chat turn, read history, reset a session, poll repository status, and a
//! health check. `SessionNotFound` maps to 404, distinct from generic
//! failures.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use xplain_agent::{ChatEngine, Turn};
use xplain_common::Error;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ChatEngine>,
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Load-repository request body.
#[derive(Debug, Serialize, Deserialize)]
pub struct LoadRepoRequest {
    pub session_id: String,
    pub repo_url: String,
}

/// Load-repository response.
#[derive(Debug, Serialize, Deserialize)]
pub struct LoadRepoResponse {
    pub status: String,
    pub message: String,
}

/// Chat request body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    pub text: String,
}

/// Chat response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub history: Vec<Turn>,
}

/// History response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub turns: Vec<Turn>,
}

/// Reset acknowledgement.
#[derive(Debug, Serialize, Deserialize)]
pub struct ResetResponse {
    pub status: String,
}

/// Repository status response.
#[derive(Debug, Serialize, Deserialize)]
pub struct RepoStatusResponse {
    pub loaded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo_url: Option<String>,
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

// ============================================================================
// Error Mapping
// ============================================================================

/// Wrapper turning [`Error`] into an HTTP response.
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let code = match &self.0 {
            Error::Config(_) => "configuration",
            Error::Auth(_) => "auth_error",
            Error::RateLimited(_) => "rate_limited",
            Error::Provider(_) => "provider_error",
            Error::SessionNotFound(_) => "session_not_found",
            Error::InvalidInput(_) => "invalid_input",
            _ => "internal",
        };

        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        }

        let body = Json(ErrorResponse {
            error: self.0.to_string(),
            code: code.to_string(),
        });
        (status, body).into_response()
    }
}

// ============================================================================
// Handlers
// ============================================================================

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".into(),
        service: "xplain-api".into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}

async fn load_repo(
    State(state): State<AppState>,
    Json(request): Json<LoadRepoRequest>,
) -> Result<Json<LoadRepoResponse>, ApiError> {
    let reference = state
        .engine
        .load_repository(&request.session_id, &request.repo_url)
        .await?;

    Ok(Json(LoadRepoResponse {
        status: "success".into(),
        message: format!("Repository {} loaded successfully", reference.full_name()),
    }))
}

async fn chat(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let outcome = state.engine.send_chat_turn(&session_id, &request.text).await?;

    Ok(Json(ChatResponse {
        response: outcome.answer,
        history: outcome.history,
    }))
}

async fn get_history(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let turns = state.engine.history(&session_id).await?;
    Ok(Json(HistoryResponse { turns }))
}

async fn reset_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<ResetResponse>, ApiError> {
    state.engine.reset_session(&session_id).await?;
    Ok(Json(ResetResponse {
        status: "success".into(),
    }))
}

async fn repo_status(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Json<RepoStatusResponse> {
    let repo = state.engine.repo_status(&session_id).await;
    Json(RepoStatusResponse {
        loaded: repo.is_some(),
        repo_url: repo.map(|r| r.url),
    })
}

// ============================================================================
// Router
// ============================================================================

/// Build the API router over a chat engine.
pub fn build_router(engine: Arc<ChatEngine>) -> Router {
    let state = AppState { engine };

    Router::new()
        .route("/health", get(health))
        .route("/load-repo", post(load_repo))
        .route("/chat/:session_id", post(chat).delete(reset_session))
        .route("/chat/:session_id/history", get(get_history))
        .route("/repo-status/:session_id", get(repo_status))
        .with_state(state)
}
