//! Repository reference parsing.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use xplain_common::{Error, Result};

// Accepts https://github.com/owner/repo(.git) and git@github.com:owner/repo(.git)
static REPO_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"github\.com[:/]([^/\s]+)/([^/\s]+?)(?:\.git)?/?$").expect("valid repo url regex")
});

/// A session's pointer to a loaded repository.
///
/// One session owns zero or one active reference; it is replaced wholesale
/// on reload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoReference {
    /// Original clone URL
    pub url: String,
    /// Repository owner (user or organization)
    pub owner: String,
    /// Repository name
    pub repo: String,
    /// When the reference was created
    pub loaded_at: DateTime<Utc>,
}

impl RepoReference {
    /// Parse a GitHub repository URL into a reference.
    pub fn parse(url: &str) -> Result<Self> {
        let caps = REPO_URL
            .captures(url)
            .ok_or_else(|| Error::InvalidInput(format!("Invalid GitHub repository URL: {url}")))?;

        Ok(Self {
            url: url.to_string(),
            owner: caps[1].to_string(),
            repo: caps[2].to_string(),
            loaded_at: Utc::now(),
        })
    }

    /// `owner/repo` form used in search qualifiers and log lines.
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}
