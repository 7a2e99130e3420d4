//! System prompts for the two LLM calls.

use crate::intent::Intent;
use crate::session::Turn;

/// System prompt for the intent classification call.
///
/// The model sees the label set and must answer with exactly one label.
/// Parsing is tolerant anyway; see `classifier`.
pub const CLASSIFIER_SYSTEM_PROMPT: &str = "\
You classify the intent of a user's message in a conversation about a \
software repository. Reply with exactly one of these labels and nothing else:

- greeting: salutations, thanks, goodbyes
- general_conversation: small talk or questions not about the loaded repository
- code_analysis: questions about specific code, files, functions, or behavior
- architecture_overview: questions about overall structure, layout, or design
- issue_search: requests to find issues or pull requests by topic
- issue_details: requests about one specific issue or pull request
- clarification: follow-ups asking to expand or re-explain the previous answer

The input includes whether a repository is currently loaded. That flag is \
informational; still pick the label that best fits the message itself.";

/// System prompt for the answer synthesis call.
pub const SYNTHESIZER_SYSTEM_PROMPT: &str = "\
You are a code analysis assistant answering questions about a software \
repository. Ground your answer in the provided context when it is present, \
and say so when the context does not cover the question. If the context \
contains availability notes about data that could not be fetched, mention \
that limitation in your answer. Be concise and concrete; reference file \
paths and issue numbers where relevant.";

/// Render the classifier input: recent history, the load-state flag, and
/// the message to classify.
pub fn classifier_input(user_text: &str, history: &[Turn], repo_loaded: bool) -> String {
    let mut input = String::new();

    if !history.is_empty() {
        input.push_str("Recent conversation:\n");
        for turn in history {
            input.push_str(&format!("{}: {}\n", turn.role.as_str(), turn.text));
        }
        input.push('\n');
    }

    input.push_str(&format!(
        "Repository loaded: {}\n\nMessage to classify: {}",
        if repo_loaded { "yes" } else { "no" },
        user_text
    ));

    input
}

/// Render the label list for logs and error messages.
pub fn label_list() -> String {
    Intent::ALL
        .iter()
        .map(|i| i.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
