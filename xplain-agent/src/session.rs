//! Session types.

use crate::orchestrator::ContextBundle;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use xplain_tools::RepoReference;

/// Role of a turn in a conversation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    /// User message
    User,
    /// Assistant (AI) response
    Assistant,
}

impl TurnRole {
    /// Convert to the string form used on the wire and in prompts.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// A single turn in a conversation session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    /// Create a user turn stamped now.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create an assistant turn stamped now.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

/// One conversation session.
///
/// The turn sequence is append-only and ordered by arrival;
/// [`Session::append_exchange`] is the only mutation path, and it runs only
/// after a successful synthesis.
#[derive(Debug)]
pub struct Session {
    /// Opaque session identifier
    pub id: String,
    turns: Vec<Turn>,
    /// Currently loaded repository, if any; replaced wholesale on reload
    pub repo: Option<RepoReference>,
    /// Most recent context bundle, reused only by clarification turns.
    /// Overwritten on every non-clarification turn.
    pub cached_bundle: Option<ContextBundle>,
}

impl Session {
    /// Create an empty session.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            turns: Vec::new(),
            repo: None,
            cached_bundle: None,
        }
    }

    /// Full ordered turn history.
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// The most recent `limit` turns, oldest first.
    pub fn recent_turns(&self, limit: usize) -> &[Turn] {
        let start = self.turns.len().saturating_sub(limit);
        &self.turns[start..]
    }

    /// Whether a repository is currently loaded.
    pub fn repo_loaded(&self) -> bool {
        self.repo.is_some()
    }

    /// Append a completed user/assistant exchange.
    pub fn append_exchange(&mut self, user_text: impl Into<String>, answer: impl Into<String>) {
        self.turns.push(Turn::user(user_text));
        self.turns.push(Turn::assistant(answer));
    }
}
