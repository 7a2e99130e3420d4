//! Xplain Tools - external collaborators the chat core calls but does not implement.
//!
//! This crate provides:
//! - Repository snapshot provider (clone, walk, bounded content selection)
//! - GitHub issue/PR search client
//! - Repository reference parsing shared by both
//!
//! Both collaborators sit behind async traits so the orchestrator can be
//! exercised against in-memory implementations.

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod github;
pub mod repo;
pub mod snapshot;

pub use github::{GithubClient, IssueComment, IssueDetail, IssueRecord, IssueSearchOutcome, IssueSearcher};
pub use repo::RepoReference;
pub use snapshot::{FileSummary, GitSnapshotProvider, ImportGraph, RepoSnapshot, SnapshotProvider};
