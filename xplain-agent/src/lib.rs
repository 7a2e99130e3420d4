//! Xplain Agent - the conversational core.
//!
//! One chat turn flows through three stages:
//!
//! ```text
//! user text → IntentClassifier → ToolOrchestrator → ResponseSynthesizer
//!                  (LLM call)      (collaborators)       (LLM call)
//! ```
//!
//! The classifier maps the message onto a closed intent set, the
//! orchestrator conditionally invokes the repository snapshot provider
//! and/or the issue search client and folds the results into a
//! request-scoped context bundle, and the synthesizer turns everything into
//! the final answer. Session state lives in [`registry::SessionRegistry`];
//! a turn holds its session's lock from classification through the history
//! append, so concurrent requests for one session serialize cleanly.

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod classifier;
pub mod engine;
pub mod intent;
pub mod orchestrator;
pub mod prompts;
pub mod registry;
pub mod session;
pub mod synthesizer;

pub use classifier::{Classification, IntentClassifier};
pub use engine::{ChatEngine, ChatTurnOutcome};
pub use intent::{extract_issue_number, Intent, ToolPlan};
pub use orchestrator::{ContextBundle, ContextSection, ToolOrchestrator};
pub use registry::SessionRegistry;
pub use session::{Session, Turn, TurnRole};
pub use synthesizer::ResponseSynthesizer;
