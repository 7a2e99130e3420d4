//! Tool orchestration.
//!
//! Given a classified intent, invokes zero or more collaborators and merges
//! their outputs into a request-scoped [`ContextBundle`]. Collaborator
//! failures never abort the turn; they become human-readable notes in the
//! bundle, and the synthesizer surfaces them to the user.

use crate::classifier::Classification;
use crate::intent::Intent;
use crate::session::Turn;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use xplain_common::config::SnapshotConfig;
use xplain_tools::{IssueSearchOutcome, IssueSearcher, RepoReference, RepoSnapshot, SnapshotProvider};

/// Cap on how many file names the structure section lists.
const MAX_LISTED_FILES: usize = 200;

// ============================================================================
// Context Bundle
// ============================================================================

/// One titled block of tool output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextSection {
    pub title: String,
    pub body: String,
}

/// Ephemeral, request-scoped aggregation of tool outputs for one turn.
///
/// Never persisted beyond the turn, except that the session keeps the most
/// recent bundle for clarification reuse.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextBundle {
    pub sections: Vec<ContextSection>,
    /// Human-readable degradation notes (collaborator failures, policy notes)
    pub notes: Vec<String>,
    /// Set when this bundle was reused from a previous turn
    pub stale: bool,
}

impl ContextBundle {
    /// Bundle with no content at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether the bundle has neither sections nor notes.
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty() && self.notes.is_empty()
    }

    fn push_section(&mut self, title: impl Into<String>, body: impl Into<String>) {
        self.sections.push(ContextSection {
            title: title.into(),
            body: body.into(),
        });
    }

    fn push_note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }

    /// Render for inclusion in the synthesis prompt.
    pub fn render(&self) -> String {
        let mut out = String::new();

        if self.stale {
            out.push_str("(Context reused from the previous turn.)\n\n");
        }

        for section in &self.sections {
            out.push_str(&format!("## {}\n{}\n\n", section.title, section.body));
        }

        if !self.notes.is_empty() {
            out.push_str("## Availability notes\n");
            for note in &self.notes {
                out.push_str(&format!("- {note}\n"));
            }
        }

        out.trim_end().to_string()
    }
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Selects and invokes collaborators per classified intent.
pub struct ToolOrchestrator {
    snapshot: Arc<dyn SnapshotProvider>,
    issues: Arc<dyn IssueSearcher>,
    snapshot_limits: SnapshotConfig,
}

impl ToolOrchestrator {
    pub fn new(
        snapshot: Arc<dyn SnapshotProvider>,
        issues: Arc<dyn IssueSearcher>,
        snapshot_limits: SnapshotConfig,
    ) -> Self {
        Self {
            snapshot,
            issues,
            snapshot_limits,
        }
    }

    /// Build the context bundle for one turn.
    ///
    /// `cached` is the session's previous bundle; only clarification turns
    /// read it, and they never re-invoke a collaborator.
    pub async fn gather(
        &self,
        classification: &Classification,
        repo: Option<&RepoReference>,
        cached: Option<&ContextBundle>,
        history: &[Turn],
    ) -> ContextBundle {
        let mut bundle = match classification.intent {
            Intent::Clarification => self.clarification_bundle(cached, history),
            _ => self.tool_bundle(classification, repo).await,
        };

        if let Some(ref note) = classification.note {
            bundle.push_note(note.clone());
        }

        bundle
    }

    /// Clarification: reuse the previous bundle when one exists, else fall
    /// back to a minimal bundle derived from history alone.
    fn clarification_bundle(
        &self,
        cached: Option<&ContextBundle>,
        history: &[Turn],
    ) -> ContextBundle {
        if let Some(previous) = cached {
            tracing::debug!("Reusing cached context bundle for clarification");
            let mut bundle = previous.clone();
            bundle.stale = true;
            return bundle;
        }

        let mut bundle = ContextBundle::empty();
        if !history.is_empty() {
            let rendered = history
                .iter()
                .map(|t| format!("{}: {}", t.role.as_str(), t.text))
                .collect::<Vec<_>>()
                .join("\n");
            bundle.push_section("Recent conversation", rendered);
        }
        bundle
    }

    async fn tool_bundle(
        &self,
        classification: &Classification,
        repo: Option<&RepoReference>,
    ) -> ContextBundle {
        let mut bundle = ContextBundle::empty();
        let plan = &classification.plan;

        if plan.fetch_snapshot {
            match repo {
                Some(repo) => match self.snapshot.summarize(repo, &self.snapshot_limits).await {
                    Ok(snapshot) => render_snapshot(&mut bundle, repo, &snapshot),
                    Err(e) => {
                        tracing::warn!(error = %e, "Snapshot collaborator failed");
                        bundle.push_note(format!("Repository snapshot unavailable: {e}"));
                    }
                },
                None => bundle.push_note("Repository snapshot unavailable: no repository loaded."),
            }
        }

        if let Some(ref query) = plan.issue_query {
            match repo {
                Some(repo) => {
                    match self.issues.search(repo, query, plan.issue_number).await {
                        Ok(outcome) => render_issues(&mut bundle, &outcome),
                        Err(e) => {
                            tracing::warn!(error = %e, "Issue search collaborator failed");
                            bundle.push_note(format!("Issue search unavailable: {e}"));
                        }
                    }
                }
                None => bundle.push_note("Issue search unavailable: no repository loaded."),
            }
        }

        bundle
    }
}

// ============================================================================
// Rendering
// ============================================================================

fn render_snapshot(bundle: &mut ContextBundle, repo: &RepoReference, snapshot: &RepoSnapshot) {
    let mut listing = String::new();
    for path in snapshot.file_list.iter().take(MAX_LISTED_FILES) {
        listing.push_str(path);
        listing.push('\n');
    }
    if snapshot.file_list.len() > MAX_LISTED_FILES {
        listing.push_str(&format!(
            "... and {} more files\n",
            snapshot.file_list.len() - MAX_LISTED_FILES
        ));
    }
    bundle.push_section(
        format!("Repository structure ({})", repo.full_name()),
        listing.trim_end().to_string(),
    );

    if !snapshot.import_graph.imports.is_empty() {
        let mut graph = String::new();
        for (file, imports) in &snapshot.import_graph.imports {
            graph.push_str(&format!("{file} imports {}\n", imports.join(", ")));
        }
        for (file, users) in &snapshot.import_graph.used_by {
            graph.push_str(&format!("{file} used by {}\n", users.join(", ")));
        }
        bundle.push_section("Import relationships", graph.trim_end().to_string());
    }

    for file in &snapshot.selected {
        let marker = if file.truncated { " (truncated)" } else { "" };
        bundle.push_section(
            format!("File: {}{marker}", file.path),
            format!("```\n{}\n```", file.content.trim_end()),
        );
    }
}

fn render_issues(bundle: &mut ContextBundle, outcome: &IssueSearchOutcome) {
    if let Some(ref detail) = outcome.detail {
        let issue = &detail.issue;
        let kind = if issue.is_pr { "Pull request" } else { "Issue" };
        let mut body = format!(
            "{kind} #{} [{}] {}\nLabels: {}\nCreated: {}\n",
            issue.number,
            issue.state,
            issue.title,
            if issue.labels.is_empty() {
                "none".to_string()
            } else {
                issue.labels.join(", ")
            },
            issue.created_at.format("%Y-%m-%d"),
        );
        if let Some(ref excerpt) = issue.excerpt {
            body.push_str(&format!("\n{excerpt}\n"));
        }
        for comment in &detail.comments {
            body.push_str(&format!(
                "\nComment by {} ({}): {}\n",
                comment.author,
                comment.created_at.format("%Y-%m-%d"),
                comment.excerpt
            ));
        }
        bundle.push_section(format!("{kind} #{}", issue.number), body.trim_end().to_string());
        return;
    }

    if outcome.fell_back_to_search {
        bundle.push_note("The requested issue number was not found; showing text search results instead.");
    }

    if outcome.matches.is_empty() {
        bundle.push_section("Issue search results", "No matching issues or pull requests.");
        return;
    }

    let mut listing = String::new();
    for issue in &outcome.matches {
        let kind = if issue.is_pr { "PR" } else { "issue" };
        listing.push_str(&format!(
            "#{} [{} {}] {} (created {})\n",
            issue.number,
            issue.state,
            kind,
            issue.title,
            issue.created_at.format("%Y-%m-%d"),
        ));
    }
    bundle.push_section("Issue search results", listing.trim_end().to_string());
}
