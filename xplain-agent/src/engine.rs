//! The chat engine: classifier → orchestrator → synthesizer, plus session
//! lifecycle.
//!
//! A turn holds its session's lock for the whole pipeline, so two
//! concurrent requests for one session serialize, appends never interleave,
//! and a failed or timed-out synthesis leaves no half-appended turn behind.

use crate::classifier::IntentClassifier;
use crate::intent::Intent;
use crate::orchestrator::ToolOrchestrator;
use crate::registry::SessionRegistry;
use crate::session::Turn;
use crate::synthesizer::ResponseSynthesizer;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use xplain_common::config::Config;
use xplain_common::logging::generate_trace_id;
use xplain_common::Result;
use xplain_gateway::LlmGateway;
use xplain_tools::{IssueSearcher, RepoReference, SnapshotProvider};

/// Result of one completed chat turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurnOutcome {
    /// The assistant's answer
    pub answer: String,
    /// Full session history including this turn
    pub history: Vec<Turn>,
}

/// Everything needed to serve chat turns.
pub struct ChatEngine {
    classifier: IntentClassifier,
    orchestrator: ToolOrchestrator,
    synthesizer: ResponseSynthesizer,
    registry: SessionRegistry,
    max_history_turns: usize,
}

impl ChatEngine {
    /// Wire up the engine from its collaborators and configuration.
    pub fn new(
        gateway: LlmGateway,
        snapshot: Arc<dyn SnapshotProvider>,
        issues: Arc<dyn IssueSearcher>,
        config: &Config,
    ) -> Self {
        let max_history_turns = config.session.max_history_turns;
        Self {
            classifier: IntentClassifier::new(gateway.clone(), max_history_turns),
            orchestrator: ToolOrchestrator::new(snapshot, issues, config.snapshot),
            synthesizer: ResponseSynthesizer::new(gateway, max_history_turns),
            registry: SessionRegistry::new(),
            max_history_turns,
        }
    }

    /// Load a repository into a session, creating the session if needed.
    ///
    /// The reference replaces any previous one wholesale, and the cached
    /// context bundle is dropped with it.
    pub async fn load_repository(&self, session_id: &str, url: &str) -> Result<RepoReference> {
        let reference = RepoReference::parse(url)?;

        let session = self.registry.get_or_create(session_id).await;
        let mut session = session.lock().await;
        session.cached_bundle = None;
        session.repo = Some(reference.clone());

        tracing::info!(
            session_id = %session_id,
            repo = %reference.full_name(),
            "Repository loaded"
        );

        Ok(reference)
    }

    /// Serve one chat turn.
    ///
    /// The session is created on first use. The user/assistant exchange is
    /// appended only after successful synthesis; any synthesis failure
    /// propagates with the history untouched.
    pub async fn send_chat_turn(&self, session_id: &str, text: &str) -> Result<ChatTurnOutcome> {
        let trace_id = generate_trace_id();
        let span = tracing::info_span!("chat_turn", session_id, %trace_id);
        let _enter = span.enter();

        let session = self.registry.get_or_create(session_id).await;
        let mut session = session.lock().await;

        let classification = self
            .classifier
            .classify(text, session.turns(), session.repo_loaded())
            .await;

        tracing::info!(intent = classification.intent.as_str(), "Turn classified");

        let bundle = self
            .orchestrator
            .gather(
                &classification,
                session.repo.as_ref(),
                session.cached_bundle.as_ref(),
                session.recent_turns(self.max_history_turns),
            )
            .await;

        let answer = self
            .synthesizer
            .synthesize(text, session.turns(), &bundle)
            .await?;

        // At most one cached bundle per session; clarification turns leave
        // the previous one in place for the next follow-up
        if classification.intent != Intent::Clarification {
            session.cached_bundle = Some(bundle);
        }

        session.append_exchange(text, &answer);

        Ok(ChatTurnOutcome {
            answer,
            history: session.turns().to_vec(),
        })
    }

    /// Ordered turn history for a session.
    pub async fn history(&self, session_id: &str) -> Result<Vec<Turn>> {
        let session = self.registry.get(session_id).await?;
        let session = session.lock().await;
        Ok(session.turns().to_vec())
    }

    /// Reset (destroy) a session.
    pub async fn reset_session(&self, session_id: &str) -> Result<()> {
        if self.registry.evict(session_id).await {
            Ok(())
        } else {
            Err(xplain_common::Error::SessionNotFound(session_id.to_string()))
        }
    }

    /// The repository currently loaded in a session, if any.
    ///
    /// An unknown session reports no repository rather than an error; this
    /// is a status poll, not a lookup.
    pub async fn repo_status(&self, session_id: &str) -> Option<RepoReference> {
        let session = self.registry.get(session_id).await.ok()?;
        let session = session.lock().await;
        session.repo.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use xplain_common::config::SnapshotConfig;
    use xplain_common::Error;
    use xplain_gateway::{ChatRequest, ChatResponse, GatewayError, Provider, TokenUsage};
    use xplain_tools::{IssueSearchOutcome, RepoSnapshot};

    struct ScriptedProvider {
        responses: Mutex<VecDeque<std::result::Result<String, GatewayError>>>,
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        fn default_model(&self) -> &str {
            "scripted-1"
        }

        async fn chat(
            &self,
            request: ChatRequest,
        ) -> std::result::Result<ChatResponse, GatewayError> {
            let next = self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("scripted response available");
            next.map(|content| ChatResponse {
                provider: "scripted".into(),
                model: request.model,
                content,
                usage: TokenUsage::default(),
                latency_ms: 0,
            })
        }
    }

    struct NoopSnapshot;

    #[async_trait]
    impl SnapshotProvider for NoopSnapshot {
        async fn summarize(
            &self,
            _repo: &RepoReference,
            _limits: &SnapshotConfig,
        ) -> Result<RepoSnapshot> {
            Err(Error::Collaborator("not wired in this test".into()))
        }
    }

    struct NoopIssues;

    #[async_trait]
    impl IssueSearcher for NoopIssues {
        async fn search(
            &self,
            _repo: &RepoReference,
            _query: &str,
            _issue_number: Option<u64>,
        ) -> Result<IssueSearchOutcome> {
            Err(Error::Collaborator("not wired in this test".into()))
        }
    }

    fn engine_with(responses: Vec<std::result::Result<String, GatewayError>>) -> ChatEngine {
        let provider = Arc::new(ScriptedProvider {
            responses: Mutex::new(responses.into()),
        });
        ChatEngine::new(
            LlmGateway::from_provider(provider, None),
            Arc::new(NoopSnapshot),
            Arc::new(NoopIssues),
            &Config::default(),
        )
    }

    #[tokio::test]
    async fn load_repository_rejects_bad_url() {
        let engine = engine_with(vec![]);
        let err = engine.load_repository("s1", "not-a-repo").await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn load_repository_replaces_reference_and_cache() {
        let engine = engine_with(vec![
            Ok("greeting".into()),
            Ok("Hello!".into()),
        ]);

        engine
            .load_repository("s1", "https://github.com/acme/one")
            .await
            .unwrap();
        engine.send_chat_turn("s1", "hi").await.unwrap();

        let reference = engine
            .load_repository("s1", "https://github.com/acme/two")
            .await
            .unwrap();
        assert_eq!(reference.repo, "two");

        let status = engine.repo_status("s1").await.unwrap();
        assert_eq!(status.repo, "two");
    }

    #[tokio::test]
    async fn history_of_unknown_session_is_not_found() {
        let engine = engine_with(vec![]);
        let err = engine.history("ghost").await.unwrap_err();
        assert!(matches!(err, Error::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn reset_unknown_session_is_not_found() {
        let engine = engine_with(vec![]);
        let err = engine.reset_session("ghost").await.unwrap_err();
        assert!(matches!(err, Error::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn reset_destroys_history() {
        let engine = engine_with(vec![
            Ok("greeting".into()),
            Ok("Hello!".into()),
        ]);

        engine.send_chat_turn("s1", "hi").await.unwrap();
        engine.reset_session("s1").await.unwrap();

        assert!(engine.history("s1").await.is_err());
    }

    #[tokio::test]
    async fn repo_status_unknown_session_is_none() {
        let engine = engine_with(vec![]);
        assert!(engine.repo_status("ghost").await.is_none());
    }
}
