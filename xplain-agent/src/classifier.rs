//! Intent classification.
//!
//! One LLM call maps (latest user text, bounded recent history, repository
//! load state) onto the closed intent set. Two policies sit on top of
//! whatever the model says:
//!
//! - the load-state flag is supplied as input, and repository-dependent
//!   intents degrade to `general_conversation` when nothing is loaded;
//! - a failed or unparseable classification falls back to
//!   `general_conversation` with no tool plan rather than failing the turn.

use crate::intent::{Intent, ToolPlan};
use crate::prompts::{classifier_input, CLASSIFIER_SYSTEM_PROMPT};
use crate::session::Turn;
use xplain_gateway::{LlmGateway, Message};

/// Note attached when a repository-dependent request arrives with no
/// repository loaded.
const NO_REPO_NOTE: &str =
    "No repository is loaded. Load one first to ask about code, architecture, or issues.";

/// Result of classifying one user turn.
#[derive(Debug, Clone)]
pub struct Classification {
    pub intent: Intent,
    pub plan: ToolPlan,
    /// Human-readable note to carry into the context bundle, when policy
    /// altered or annotated the classification
    pub note: Option<String>,
}

/// Classifies user turns via the LLM gateway.
pub struct IntentClassifier {
    gateway: LlmGateway,
    max_history_turns: usize,
}

impl IntentClassifier {
    pub fn new(gateway: LlmGateway, max_history_turns: usize) -> Self {
        Self {
            gateway,
            max_history_turns,
        }
    }

    /// Classify a user message.
    ///
    /// Never fails: provider errors and junk output degrade to
    /// `general_conversation`.
    pub async fn classify(
        &self,
        user_text: &str,
        history: &[Turn],
        repo_loaded: bool,
    ) -> Classification {
        let window_start = history.len().saturating_sub(self.max_history_turns);
        let input = classifier_input(user_text, &history[window_start..], repo_loaded);

        let raw = match self
            .gateway
            .complete(
                vec![Message::user(input)],
                Some(CLASSIFIER_SYSTEM_PROMPT.to_string()),
                None,
            )
            .await
        {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "Intent classification failed, falling back");
                return Classification {
                    intent: Intent::GeneralConversation,
                    plan: ToolPlan::none(),
                    note: None,
                };
            }
        };

        let intent = match parse_label(&raw) {
            Some(intent) => intent,
            None => {
                tracing::warn!(output = %raw, "Unparseable intent label, falling back");
                Intent::GeneralConversation
            }
        };

        // Load-state policy is enforced here, independent of the model
        if intent.requires_repository() && !repo_loaded {
            tracing::debug!(intent = intent.as_str(), "Degrading intent: no repository loaded");
            return Classification {
                intent: Intent::GeneralConversation,
                plan: ToolPlan::none(),
                note: Some(NO_REPO_NOTE.to_string()),
            };
        }

        let plan = ToolPlan::for_intent(intent, user_text);

        tracing::debug!(intent = intent.as_str(), "Classified turn");

        Classification {
            intent,
            plan,
            note: None,
        }
    }
}

/// Parse an intent label out of model output, tolerating casing,
/// whitespace, punctuation, and surrounding prose.
fn parse_label(raw: &str) -> Option<Intent> {
    let normalized: String = raw
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { ' ' })
        .collect();

    // Exact match on the first token is the expected shape
    if let Some(first) = normalized.split_whitespace().next() {
        if let Some(intent) = Intent::parse(first) {
            return Some(intent);
        }
    }

    // Otherwise scan for any label appearing as a whole token
    for token in normalized.split_whitespace() {
        if let Some(intent) = Intent::parse(token) {
            return Some(intent);
        }
    }

    None
}
