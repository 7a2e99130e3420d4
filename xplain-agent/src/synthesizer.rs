//! Response synthesis.
//!
//! The second LLM call: turns (user text, bounded history, context bundle)
//! into the final answer. Unlike classification this call has no fallback;
//! failure propagates to the caller and no turn is appended.

use crate::orchestrator::ContextBundle;
use crate::prompts::SYNTHESIZER_SYSTEM_PROMPT;
use crate::session::Turn;
use xplain_common::{Error, Result};
use xplain_gateway::{LlmGateway, Message};

/// Synthesizes final answers via the LLM gateway.
pub struct ResponseSynthesizer {
    gateway: LlmGateway,
    max_history_turns: usize,
}

impl ResponseSynthesizer {
    pub fn new(gateway: LlmGateway, max_history_turns: usize) -> Self {
        Self {
            gateway,
            max_history_turns,
        }
    }

    /// Produce the answer for one turn.
    pub async fn synthesize(
        &self,
        user_text: &str,
        history: &[Turn],
        bundle: &ContextBundle,
    ) -> Result<String> {
        let window_start = history.len().saturating_sub(self.max_history_turns);
        let mut messages: Vec<Message> = history[window_start..]
            .iter()
            .map(|t| Message {
                role: t.role.as_str().to_string(),
                content: t.text.clone(),
            })
            .collect();
        messages.push(Message::user(user_text));

        let mut system = SYNTHESIZER_SYSTEM_PROMPT.to_string();
        if !bundle.is_empty() {
            system.push_str("\n\n# Context\n\n");
            system.push_str(&bundle.render());
        }

        let answer = self
            .gateway
            .complete(messages, Some(system), None)
            .await
            .map_err(Error::from)?;

        // The prompt asks the model to surface availability notes, but the
        // user must be informed even when it does not comply
        Ok(append_missing_notes(answer, &bundle.notes))
    }
}

/// Append any note the answer does not already carry.
fn append_missing_notes(mut answer: String, notes: &[String]) -> String {
    let missing: Vec<&String> = notes.iter().filter(|n| !answer.contains(n.as_str())).collect();
    if missing.is_empty() {
        return answer;
    }

    answer.push('\n');
    for note in missing {
        answer.push_str(&format!("\nNote: {note}"));
    }
    answer
}
