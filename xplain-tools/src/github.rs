//! GitHub issue/PR search client.
//!
//! Thin client over the GitHub REST v3 API. Everything that can go wrong
//! here (network failure, rate limit, missing issue) comes back as
//! `Error::Collaborator`; the orchestrator converts those into bundle notes
//! rather than failing the turn.

use crate::repo::RepoReference;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use xplain_common::config::GithubConfig;
use xplain_common::{Error, Result};

const USER_AGENT: &str = concat!("xplain/", env!("CARGO_PKG_VERSION"));

/// Maximum characters of an issue/comment body carried into context.
const BODY_EXCERPT_CHARS: usize = 400;

// ============================================================================
// Records
// ============================================================================

/// One issue or pull request match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueRecord {
    pub number: u64,
    pub title: String,
    pub state: String,
    pub labels: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub is_pr: bool,
    /// Leading slice of the body, when present
    pub excerpt: Option<String>,
}

/// A comment on an issue or pull request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueComment {
    pub author: String,
    pub created_at: DateTime<Utc>,
    pub excerpt: String,
}

/// Detailed view of a single issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueDetail {
    pub issue: IssueRecord,
    pub comments: Vec<IssueComment>,
}

/// Outcome of one search invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IssueSearchOutcome {
    /// Matches in API order (deterministic for a given query)
    pub matches: Vec<IssueRecord>,
    /// Populated when a specific issue number was resolved
    pub detail: Option<IssueDetail>,
    /// Set when a requested issue number did not exist and the client fell
    /// back to a text search
    pub fell_back_to_search: bool,
}

// ============================================================================
// Searcher Trait
// ============================================================================

/// Boundary to the issue/PR search collaborator.
#[async_trait]
pub trait IssueSearcher: Send + Sync {
    /// Search issues and PRs. When `issue_number` is given the client
    /// resolves that issue directly; an unknown number falls back to a text
    /// search rather than failing.
    async fn search(
        &self,
        repo: &RepoReference,
        query: &str,
        issue_number: Option<u64>,
    ) -> Result<IssueSearchOutcome>;
}

// ============================================================================
// GitHub REST Client
// ============================================================================

/// GitHub REST v3 client.
pub struct GithubClient {
    client: reqwest::Client,
    api_base: String,
    search_limit: usize,
}

impl GithubClient {
    /// Create a client from configuration.
    pub fn new(config: &GithubConfig) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github.v3+json"),
        );
        if let Some(ref token) = config.token {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("token {token}"))
                    .unwrap_or_else(|_| HeaderValue::from_static("")),
            );
        }

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            search_limit: config.search_limit,
        }
    }

    /// Text search over a repository's issues and PRs.
    async fn search_text(&self, repo: &RepoReference, query: &str) -> Result<Vec<IssueRecord>> {
        // Collapse whitespace so multi-line user text makes a sane qualifier
        let clean_query = query.split_whitespace().collect::<Vec<_>>().join(" ");
        let q = format!("repo:{} {}", repo.full_name(), clean_query);
        let url = format!("{}/search/issues", self.api_base);

        let response = self
            .client
            .get(&url)
            .query(&[("q", q.as_str()), ("per_page", "30")])
            .send()
            .await
            .map_err(|e| Error::Collaborator(format!("GitHub search failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(collaborator_from_status(status.as_u16(), &body));
        }

        let result: SearchResponse = response
            .json()
            .await
            .map_err(|e| Error::Collaborator(format!("Malformed GitHub search response: {e}")))?;

        Ok(result
            .items
            .into_iter()
            .take(self.search_limit)
            .map(IssueRecord::from)
            .collect())
    }

    /// Fetch one issue. `Ok(None)` means the number does not exist.
    async fn fetch_issue(
        &self,
        repo: &RepoReference,
        number: u64,
    ) -> Result<Option<IssueRecord>> {
        let url = format!(
            "{}/repos/{}/issues/{number}",
            self.api_base,
            repo.full_name()
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Collaborator(format!("GitHub issue lookup failed: {e}")))?;

        let status = response.status();
        if status.as_u16() == 404 {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(collaborator_from_status(status.as_u16(), &body));
        }

        let issue: ApiIssue = response
            .json()
            .await
            .map_err(|e| Error::Collaborator(format!("Malformed GitHub issue response: {e}")))?;

        Ok(Some(issue.into()))
    }

    /// Fetch comments for an issue. Failures here degrade to an empty list;
    /// the issue itself is the payload that matters.
    async fn fetch_comments(&self, repo: &RepoReference, number: u64) -> Vec<IssueComment> {
        let url = format!(
            "{}/repos/{}/issues/{number}/comments",
            self.api_base,
            repo.full_name()
        );

        let response = match self
            .client
            .get(&url)
            .query(&[("per_page", "10")])
            .send()
            .await
        {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                tracing::debug!(status = r.status().as_u16(), "Comment fetch skipped");
                return Vec::new();
            }
            Err(e) => {
                tracing::debug!(error = %e, "Comment fetch skipped");
                return Vec::new();
            }
        };

        let comments: Vec<ApiComment> = match response.json().await {
            Ok(c) => c,
            Err(_) => return Vec::new(),
        };

        comments.into_iter().map(IssueComment::from).collect()
    }
}

#[async_trait]
impl IssueSearcher for GithubClient {
    async fn search(
        &self,
        repo: &RepoReference,
        query: &str,
        issue_number: Option<u64>,
    ) -> Result<IssueSearchOutcome> {
        if let Some(number) = issue_number {
            match self.fetch_issue(repo, number).await? {
                Some(issue) => {
                    let comments = self.fetch_comments(repo, number).await;
                    return Ok(IssueSearchOutcome {
                        matches: vec![issue.clone()],
                        detail: Some(IssueDetail { issue, comments }),
                        fell_back_to_search: false,
                    });
                }
                None => {
                    tracing::debug!(number, "Issue not found, falling back to text search");
                    let matches = self.search_text(repo, query).await?;
                    return Ok(IssueSearchOutcome {
                        matches,
                        detail: None,
                        fell_back_to_search: true,
                    });
                }
            }
        }

        let matches = self.search_text(repo, query).await?;
        Ok(IssueSearchOutcome {
            matches,
            detail: None,
            fell_back_to_search: false,
        })
    }
}

fn collaborator_from_status(status: u16, body: &str) -> Error {
    let summary = match status {
        401 | 403 => "GitHub rejected the request (check token or rate limit)",
        429 => "GitHub rate limit exceeded",
        _ => "GitHub request failed",
    };
    Error::Collaborator(format!("{summary} ({status}): {}", excerpt(body, 120)))
}

fn excerpt(text: &str, chars: usize) -> String {
    if text.chars().count() <= chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(chars).collect();
    format!("{cut}…")
}

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<ApiIssue>,
}

#[derive(Debug, Deserialize)]
struct ApiIssue {
    number: u64,
    title: String,
    state: String,
    #[serde(default)]
    labels: Vec<ApiLabel>,
    created_at: DateTime<Utc>,
    #[serde(default)]
    pull_request: Option<serde_json::Value>,
    #[serde(default)]
    body: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiLabel {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ApiComment {
    user: ApiUser,
    created_at: DateTime<Utc>,
    #[serde(default)]
    body: String,
}

#[derive(Debug, Deserialize)]
struct ApiUser {
    login: String,
}

impl From<ApiIssue> for IssueRecord {
    fn from(issue: ApiIssue) -> Self {
        Self {
            number: issue.number,
            title: issue.title,
            state: issue.state,
            labels: issue.labels.into_iter().map(|l| l.name).collect(),
            created_at: issue.created_at,
            is_pr: issue.pull_request.is_some(),
            excerpt: issue.body.map(|b| excerpt(&b, BODY_EXCERPT_CHARS)),
        }
    }
}

impl From<ApiComment> for IssueComment {
    fn from(comment: ApiComment) -> Self {
        Self {
            author: comment.user.login,
            created_at: comment.created_at,
            excerpt: excerpt(&comment.body, BODY_EXCERPT_CHARS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excerpt_short_text_untouched() {
        assert_eq!(excerpt("hello", 10), "hello");
    }

    #[test]
    fn excerpt_truncates_with_ellipsis() {
        let long = "a".repeat(50);
        let cut = excerpt(&long, 10);
        assert_eq!(cut.chars().count(), 11);
        assert!(cut.ends_with('…'));
    }

    #[test]
    fn api_issue_maps_to_record() {
        let json = r#"{
            "number": 42,
            "title": "Fix the flux capacitor",
            "state": "open",
            "labels": [{"name": "bug"}, {"name": "p1"}],
            "created_at": "2024-06-01T12:00:00Z",
            "pull_request": {"url": "https://example.com"},
            "body": "It overheats."
        }"#;
        let issue: ApiIssue = serde_json::from_str(json).unwrap();
        let record = IssueRecord::from(issue);

        assert_eq!(record.number, 42);
        assert!(record.is_pr);
        assert_eq!(record.labels, vec!["bug", "p1"]);
        assert_eq!(record.excerpt.as_deref(), Some("It overheats."));
    }

    #[test]
    fn api_issue_without_pr_field() {
        let json = r#"{
            "number": 7,
            "title": "Question",
            "state": "closed",
            "created_at": "2024-06-01T12:00:00Z"
        }"#;
        let issue: ApiIssue = serde_json::from_str(json).unwrap();
        let record = IssueRecord::from(issue);
        assert!(!record.is_pr);
        assert!(record.excerpt.is_none());
    }

    #[test]
    fn status_mapping_names_rate_limits() {
        let err = collaborator_from_status(429, "slow down");
        assert!(err.to_string().contains("rate limit"));
        assert!(err.is_collaborator());
    }
}
