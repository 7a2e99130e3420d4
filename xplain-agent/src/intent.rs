//! Intent labels and tool plans.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// The classified purpose of a user's chat turn.
///
/// Closed set; anything the classifier cannot place lands on
/// `GeneralConversation`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Greeting,
    GeneralConversation,
    CodeAnalysis,
    ArchitectureOverview,
    IssueSearch,
    IssueDetails,
    Clarification,
}

impl Intent {
    /// All labels, in prompt order.
    pub const ALL: &'static [Intent] = &[
        Intent::Greeting,
        Intent::GeneralConversation,
        Intent::CodeAnalysis,
        Intent::ArchitectureOverview,
        Intent::IssueSearch,
        Intent::IssueDetails,
        Intent::Clarification,
    ];

    /// Convert to the label used in prompts and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Greeting => "greeting",
            Self::GeneralConversation => "general_conversation",
            Self::CodeAnalysis => "code_analysis",
            Self::ArchitectureOverview => "architecture_overview",
            Self::IssueSearch => "issue_search",
            Self::IssueDetails => "issue_details",
            Self::Clarification => "clarification",
        }
    }

    /// Parse a label. Returns `None` for anything outside the closed set.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "greeting" => Some(Self::Greeting),
            "general_conversation" => Some(Self::GeneralConversation),
            "code_analysis" => Some(Self::CodeAnalysis),
            "architecture_overview" => Some(Self::ArchitectureOverview),
            "issue_search" => Some(Self::IssueSearch),
            "issue_details" => Some(Self::IssueDetails),
            "clarification" => Some(Self::Clarification),
            _ => None,
        }
    }

    /// Whether this intent needs a loaded repository to be serviceable.
    pub const fn requires_repository(self) -> bool {
        matches!(
            self,
            Self::CodeAnalysis | Self::ArchitectureOverview | Self::IssueSearch | Self::IssueDetails
        )
    }
}

/// Which collaborators to invoke for a turn, with their parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolPlan {
    /// Invoke the repository snapshot provider
    pub fetch_snapshot: bool,
    /// Query text for the issue search client
    pub issue_query: Option<String>,
    /// Specific issue/PR number extracted from the user text
    pub issue_number: Option<u64>,
}

impl ToolPlan {
    /// A plan that invokes nothing.
    pub fn none() -> Self {
        Self::default()
    }

    /// Derive the plan for an intent from the user text.
    pub fn for_intent(intent: Intent, user_text: &str) -> Self {
        match intent {
            Intent::CodeAnalysis | Intent::ArchitectureOverview => Self {
                fetch_snapshot: true,
                ..Self::default()
            },
            Intent::IssueSearch => Self {
                issue_query: Some(user_text.to_string()),
                ..Self::default()
            },
            Intent::IssueDetails => Self {
                issue_query: Some(user_text.to_string()),
                issue_number: extract_issue_number(user_text),
                ..Self::default()
            },
            Intent::Greeting | Intent::GeneralConversation | Intent::Clarification => Self::none(),
        }
    }

    /// Whether the plan invokes any collaborator.
    pub fn is_empty(&self) -> bool {
        !self.fetch_snapshot && self.issue_query.is_none()
    }
}

// "#123", "issue 123", "PR #45", "pull request 45"
static HASH_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"#(\d+)\b").expect("valid regex"));
static WORD_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:issue|pr|pull\s+request)\s*#?\s*(\d+)\b").expect("valid regex")
});

/// Extract an issue/PR number from free text, when one is present.
pub fn extract_issue_number(text: &str) -> Option<u64> {
    HASH_NUMBER
        .captures(text)
        .or_else(|| WORD_NUMBER.captures(text))
        .and_then(|caps| caps[1].parse().ok())
}
