//! End-to-end engine tests over scripted providers and stub collaborators.
//!
//! These exercise the turn pipeline's observable properties: append-only
//! history, load-state degradation, collaborator-failure degradation,
//! clarification reuse, and per-session serialization.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use xplain_agent::{ChatEngine, TurnRole};
use xplain_common::config::{Config, SnapshotConfig};
use xplain_common::{Error, Result};
use xplain_gateway::{ChatRequest, ChatResponse, GatewayError, LlmGateway, Provider, TokenUsage};
use xplain_tools::{
    FileSummary, IssueRecord, IssueSearchOutcome, IssueSearcher, RepoReference, RepoSnapshot,
    SnapshotProvider,
};

// ─────────────────────────────────────────────────────────────────────────────
// Test Doubles
// ─────────────────────────────────────────────────────────────────────────────

/// Provider that replays scripted responses in call order.
struct ScriptedProvider {
    responses: Mutex<VecDeque<std::result::Result<String, GatewayError>>>,
}

impl ScriptedProvider {
    fn new(responses: Vec<std::result::Result<String, GatewayError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
        })
    }
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

/// Snapshot stub counting invocations.
struct CountingSnapshot {
    calls: AtomicUsize,
    fail: bool,
}

impl CountingSnapshot {
    fn new(fail: bool) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail,
        })
    }
}

#[async_trait]
impl SnapshotProvider for CountingSnapshot {
    async fn summarize(
        &self,
        _repo: &RepoReference,
        _limits: &SnapshotConfig,
    ) -> Result<RepoSnapshot> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::Collaborator("simulated network error".into()));
        }
        Ok(RepoSnapshot {
            file_list: vec!["src/main.rs".into()],
            selected: vec![FileSummary {
                path: "src/main.rs".into(),
                content: "fn main() {}".into(),
                truncated: false,
            }],
            import_graph: Default::default(),
        })
    }
}

/// Issue search stub recording the number it was invoked with.
struct CountingIssues {
    calls: AtomicUsize,
    last_number: Mutex<Option<Option<u64>>>,
}

impl CountingIssues {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            last_number: Mutex::new(None),
        })
    }
}

#[async_trait]
impl IssueSearcher for CountingIssues {
    async fn search(
        &self,
        _repo: &RepoReference,
        _query: &str,
        issue_number: Option<u64>,
    ) -> Result<IssueSearchOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_number.lock().unwrap() = Some(issue_number);
        Ok(IssueSearchOutcome {
            matches: vec![IssueRecord {
                number: issue_number.unwrap_or(1),
                title: "Sample issue".into(),
                state: "open".into(),
                labels: vec![],
                created_at: chrono::Utc::now(),
                is_pr: false,
                excerpt: None,
            }],
            detail: None,
            fell_back_to_search: false,
        })
    }
}

fn build_engine(
    responses: Vec<std::result::Result<String, GatewayError>>,
    snapshot: Arc<CountingSnapshot>,
    issues: Arc<CountingIssues>,
) -> ChatEngine {
    ChatEngine::new(
        LlmGateway::from_provider(ScriptedProvider::new(responses), None),
        snapshot,
        issues,
        &Config::default(),
    )
}

const REPO_URL: &str = "https://github.com/acme/widgets";

// ─────────────────────────────────────────────────────────────────────────────
// Properties
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn greeting_appends_one_exchange_without_tools() {
    let snapshot = CountingSnapshot::new(false);
    let issues = CountingIssues::new();
    let engine = build_engine(
        vec![Ok("greeting".into()), Ok("Hello! Load a repo to begin.".into())],
        snapshot.clone(),
        issues.clone(),
    );

    let outcome = engine.send_chat_turn("s1", "hi there").await.unwrap();

    assert_eq!(outcome.answer, "Hello! Load a repo to begin.");
    assert_eq!(outcome.history.len(), 2);
    assert_eq!(outcome.history[0].role, TurnRole::User);
    assert_eq!(outcome.history[1].role, TurnRole::Assistant);
    assert_eq!(snapshot.calls.load(Ordering::SeqCst), 0);
    assert_eq!(issues.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn code_question_without_repo_degrades_and_invokes_nothing() {
    let snapshot = CountingSnapshot::new(false);
    let issues = CountingIssues::new();
    let engine = build_engine(
        vec![
            Ok("code_analysis".into()),
            Ok("I can't inspect code yet.".into()),
        ],
        snapshot.clone(),
        issues.clone(),
    );

    let outcome = engine
        .send_chat_turn("s1", "How does auth work?")
        .await
        .unwrap();

    assert_eq!(snapshot.calls.load(Ordering::SeqCst), 0);
    assert_eq!(issues.calls.load(Ordering::SeqCst), 0);
    assert!(outcome.answer.contains("No repository is loaded"));
    assert_eq!(outcome.history.len(), 2);
}

#[tokio::test]
async fn issue_details_invokes_searcher_with_number() {
    let snapshot = CountingSnapshot::new(false);
    let issues = CountingIssues::new();
    let engine = build_engine(
        vec![
            Ok("issue_details".into()),
            Ok("Issue #123 tracks the login hang.".into()),
        ],
        snapshot,
        issues.clone(),
    );

    engine.load_repository("s1", REPO_URL).await.unwrap();
    engine
        .send_chat_turn("s1", "Tell me about issue #123")
        .await
        .unwrap();

    assert_eq!(issues.calls.load(Ordering::SeqCst), 1);
    assert_eq!(*issues.last_number.lock().unwrap(), Some(Some(123)));
}

#[tokio::test]
async fn collaborator_failure_still_completes_the_turn() {
    let snapshot = CountingSnapshot::new(true);
    let issues = CountingIssues::new();
    let engine = build_engine(
        vec![
            Ok("code_analysis".into()),
            Ok("Here's what I can say without the code.".into()),
        ],
        snapshot.clone(),
        issues,
    );

    engine.load_repository("s1", REPO_URL).await.unwrap();
    let outcome = engine
        .send_chat_turn("s1", "What does main do?")
        .await
        .unwrap();

    assert_eq!(snapshot.calls.load(Ordering::SeqCst), 1);
    assert!(outcome.answer.contains("Repository snapshot unavailable"));
    // Exactly one exchange landed despite the failure
    assert_eq!(outcome.history.len(), 2);
}

#[tokio::test]
async fn synthesis_failure_appends_nothing() {
    let snapshot = CountingSnapshot::new(false);
    let issues = CountingIssues::new();
    let engine = build_engine(
        vec![
            Ok("greeting".into()),
            Err(GatewayError::RateLimited {
                provider: "scripted".into(),
                message: "try later".into(),
            }),
        ],
        snapshot,
        issues,
    );

    let err = engine.send_chat_turn("s1", "hello").await.unwrap_err();
    assert!(err.is_rate_limited());

    // The session exists (created on first request) but gained no turns
    let history = engine.history("s1").await.unwrap();
    assert!(history.is_empty());
}

#[tokio::test]
async fn clarification_reuses_cached_bundle() {
    let snapshot = CountingSnapshot::new(false);
    let issues = CountingIssues::new();
    let engine = build_engine(
        vec![
            Ok("code_analysis".into()),
            Ok("main is the entry point.".into()),
            Ok("clarification".into()),
            Ok("Expanding: main calls run().".into()),
        ],
        snapshot.clone(),
        issues,
    );

    engine.load_repository("s1", REPO_URL).await.unwrap();
    engine
        .send_chat_turn("s1", "What does main do?")
        .await
        .unwrap();
    engine
        .send_chat_turn("s1", "Can you expand on that?")
        .await
        .unwrap();

    // The clarification turn reused the previous bundle
    assert_eq!(snapshot.calls.load(Ordering::SeqCst), 1);

    let history = engine.history("s1").await.unwrap();
    assert_eq!(history.len(), 4);
}

#[tokio::test]
async fn non_clarification_turn_overwrites_cached_bundle() {
    let snapshot = CountingSnapshot::new(false);
    let issues = CountingIssues::new();
    let engine = build_engine(
        vec![
            Ok("code_analysis".into()),
            Ok("a1".into()),
            Ok("code_analysis".into()),
            Ok("a2".into()),
        ],
        snapshot.clone(),
        issues,
    );

    engine.load_repository("s1", REPO_URL).await.unwrap();
    engine.send_chat_turn("s1", "What does main do?").await.unwrap();
    engine.send_chat_turn("s1", "And the parser?").await.unwrap();

    // Each non-clarification turn re-derives its own bundle
    assert_eq!(snapshot.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn concurrent_turns_on_one_session_never_interleave() {
    let snapshot = CountingSnapshot::new(false);
    let issues = CountingIssues::new();
    let engine = Arc::new(build_engine(
        vec![
            Ok("greeting".into()),
            Ok("first answer".into()),
            Ok("greeting".into()),
            Ok("second answer".into()),
        ],
        snapshot,
        issues,
    ));

    let a = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.send_chat_turn("shared", "message A").await })
    };
    let b = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.send_chat_turn("shared", "message B").await })
    };

    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();

    let history = engine.history("shared").await.unwrap();
    assert_eq!(history.len(), 4);

    // No lost update, no interleaving: strict user/assistant alternation
    for (i, turn) in history.iter().enumerate() {
        let expected = if i % 2 == 0 {
            TurnRole::User
        } else {
            TurnRole::Assistant
        };
        assert_eq!(turn.role, expected, "turn {i} out of order");
    }

    let user_texts: Vec<&str> = history
        .iter()
        .filter(|t| t.role == TurnRole::User)
        .map(|t| t.text.as_str())
        .collect();
    assert!(user_texts.contains(&"message A"));
    assert!(user_texts.contains(&"message B"));
}

#[tokio::test]
async fn sessions_do_not_share_state() {
    let snapshot = CountingSnapshot::new(false);
    let issues = CountingIssues::new();
    let engine = build_engine(
        vec![
            Ok("greeting".into()),
            Ok("hi A".into()),
            Ok("greeting".into()),
            Ok("hi B".into()),
        ],
        snapshot,
        issues,
    );

    engine.load_repository("a", REPO_URL).await.unwrap();
    engine.send_chat_turn("a", "hello from A").await.unwrap();
    engine.send_chat_turn("b", "hello from B").await.unwrap();

    assert_eq!(engine.history("a").await.unwrap().len(), 2);
    assert_eq!(engine.history("b").await.unwrap().len(), 2);
    assert!(engine.repo_status("b").await.is_none());
}
