//! Repository snapshot provider.
//!
//! Clones a repository, walks it with gitignore awareness, and selects a
//! bounded set of files as grounding context. Every dimension of the
//! selection is capped (file count, bytes per file, total bytes) so a large
//! repository cannot blow up the context handed to the synthesizer.
//!
//! A lightweight per-language import scan over the selected files produces
//! an `imports` / `used_by` map, which is cheap to compute and answers most
//! "what depends on what" questions without a real parser.

use crate::repo::RepoReference;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use xplain_common::config::SnapshotConfig;
use xplain_common::{Error, Result};

/// File extensions treated as source for snapshot purposes.
const SOURCE_EXTENSIONS: &[&str] = &[
    "rs", "py", "js", "jsx", "ts", "tsx", "go", "java", "kt", "rb", "c", "h", "cpp", "hpp", "cs",
    "toml", "yaml", "yml", "json", "md",
];

/// Files pulled to the front of the selection regardless of location.
const PRIORITY_NAMES: &[&str] = &[
    "README.md",
    "Cargo.toml",
    "package.json",
    "pyproject.toml",
    "setup.py",
    "go.mod",
];

/// Entry-point stems ranked just behind the priority names.
const ENTRY_STEMS: &[&str] = &["main", "lib", "app", "index", "api", "server", "cli"];

// ============================================================================
// Snapshot Types
// ============================================================================

/// Contents of one selected file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileSummary {
    /// Path relative to the repository root
    pub path: String,
    /// File content, possibly truncated
    pub content: String,
    /// Whether content was cut at the per-file byte cap
    pub truncated: bool,
}

/// Same-repository import relationships over the selected files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportGraph {
    /// file → files it imports
    pub imports: BTreeMap<String, Vec<String>>,
    /// file → files that import it
    pub used_by: BTreeMap<String, Vec<String>>,
}

/// Structural summary of a repository used as grounding context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoSnapshot {
    /// All source files discovered (names only, no contents)
    pub file_list: Vec<String>,
    /// Bounded selection of file contents
    pub selected: Vec<FileSummary>,
    /// Import relationships among the selected files
    pub import_graph: ImportGraph,
}

// ============================================================================
// Provider Trait
// ============================================================================

/// Boundary to the repository snapshot collaborator.
#[async_trait]
pub trait SnapshotProvider: Send + Sync {
    /// Produce a bounded structural summary of the repository.
    async fn summarize(&self, repo: &RepoReference, limits: &SnapshotConfig)
        -> Result<RepoSnapshot>;
}

/// Snapshot provider that clones the repository into a temporary directory.
#[derive(Debug, Default)]
pub struct GitSnapshotProvider;

impl GitSnapshotProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SnapshotProvider for GitSnapshotProvider {
    async fn summarize(
        &self,
        repo: &RepoReference,
        limits: &SnapshotConfig,
    ) -> Result<RepoSnapshot> {
        let url = repo.url.clone();
        let full_name = repo.full_name();
        let limits = *limits;

        // git2 and the file walk are blocking; keep them off the runtime
        let snapshot = tokio::task::spawn_blocking(move || -> Result<RepoSnapshot> {
            let dir = tempfile::tempdir()
                .map_err(|e| Error::Collaborator(format!("Failed to create clone dir: {e}")))?;

            tracing::info!(repo = %full_name, "Cloning repository for snapshot");

            git2::build::RepoBuilder::new()
                .clone(&url, dir.path())
                .map_err(|e| Error::Collaborator(format!("Failed to clone {full_name}: {e}")))?;

            snapshot_from_dir(dir.path(), &limits)
        })
        .await
        .map_err(|e| Error::Internal(format!("Snapshot task panicked: {e}")))??;

        tracing::info!(
            files = snapshot.file_list.len(),
            selected = snapshot.selected.len(),
            "Snapshot complete"
        );

        Ok(snapshot)
    }
}

// ============================================================================
// Local Walk + Selection
// ============================================================================

/// Build a snapshot from an already-materialized repository directory.
///
/// Split out from the clone path so tests can run against fixture trees.
pub fn snapshot_from_dir(root: &Path, limits: &SnapshotConfig) -> Result<RepoSnapshot> {
    let mut files: Vec<String> = Vec::new();

    for entry in ignore::WalkBuilder::new(root).hidden(true).build().flatten() {
        let path = entry.path();
        if !path.is_file() || !is_source_file(path) {
            continue;
        }
        if let Ok(rel) = path.strip_prefix(root) {
            files.push(rel.to_string_lossy().replace('\\', "/"));
        }
    }

    files.sort();

    // Rank, then read contents under the caps
    let mut ranked = files.clone();
    ranked.sort_by_key(|p| rank_key(p));

    let mut selected = Vec::new();
    let mut total_bytes = 0usize;

    for rel in &ranked {
        if selected.len() >= limits.max_files || total_bytes >= limits.max_total_bytes {
            break;
        }

        let Ok(raw) = std::fs::read(root.join(rel)) else {
            continue;
        };
        let content = String::from_utf8_lossy(&raw).into_owned();
        let (content, truncated) = truncate_at_boundary(content, limits.max_bytes_per_file);

        total_bytes += content.len();
        selected.push(FileSummary {
            path: rel.clone(),
            content,
            truncated,
        });
    }

    let import_graph = build_import_graph(&selected, &files);

    Ok(RepoSnapshot {
        file_list: files,
        selected,
        import_graph,
    })
}

fn is_source_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext))
}

/// Sort key: priority names, then entry points, then everything else;
/// shallow paths before deep ones, alphabetical within a tier.
fn rank_key(rel: &str) -> (u8, usize, String) {
    let name = rel.rsplit('/').next().unwrap_or(rel);
    let stem = name.rsplit_once('.').map_or(name, |(s, _)| s);

    let tier = if PRIORITY_NAMES.contains(&name) {
        0
    } else if ENTRY_STEMS.contains(&stem) {
        1
    } else {
        2
    };

    (tier, rel.matches('/').count(), rel.to_string())
}

fn truncate_at_boundary(content: String, cap: usize) -> (String, bool) {
    if content.len() <= cap {
        return (content, false);
    }
    let mut end = cap;
    while end > 0 && !content.is_char_boundary(end) {
        end -= 1;
    }
    (content[..end].to_string(), true)
}

// ============================================================================
// Import Scan
// ============================================================================

static PY_IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*(?:from\s+([\w.]+)\s+import|import\s+([\w.]+))").expect("valid regex")
});
static RS_MOD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*(?:pub\s+)?mod\s+(\w+)\s*;").expect("valid regex"));
static RS_USE_CRATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*use\s+crate::(\w+)").expect("valid regex"));
static JS_IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:from|require\()\s*['"](\.{1,2}/[^'"]+)['"]"#).expect("valid regex")
});

/// Resolve same-repo imports for the selected files.
fn build_import_graph(selected: &[FileSummary], all_files: &[String]) -> ImportGraph {
    let known: BTreeSet<&str> = all_files.iter().map(String::as_str).collect();
    let mut graph = ImportGraph::default();

    for file in selected {
        let targets = scan_imports(&file.path, &file.content, &known);
        if targets.is_empty() {
            continue;
        }
        for target in &targets {
            graph
                .used_by
                .entry(target.clone())
                .or_default()
                .push(file.path.clone());
        }
        graph.imports.insert(file.path.clone(), targets);
    }

    graph
}

fn scan_imports(path: &str, content: &str, known: &BTreeSet<&str>) -> Vec<String> {
    let dir = path.rsplit_once('/').map_or("", |(d, _)| d);
    let mut targets = BTreeSet::new();

    if path.ends_with(".py") {
        for caps in PY_IMPORT.captures_iter(content) {
            let module = caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str());
            if let Some(module) = module {
                let as_path = module.replace('.', "/");
                for candidate in [
                    join(dir, &format!("{as_path}.py")),
                    format!("{as_path}.py"),
                ] {
                    if known.contains(candidate.as_str()) {
                        targets.insert(candidate);
                        break;
                    }
                }
            }
        }
    } else if path.ends_with(".rs") {
        for caps in RS_MOD.captures_iter(content) {
            let name = &caps[1];
            for candidate in [
                join(dir, &format!("{name}.rs")),
                join(dir, &format!("{name}/mod.rs")),
            ] {
                if known.contains(candidate.as_str()) {
                    targets.insert(candidate);
                    break;
                }
            }
        }
        for caps in RS_USE_CRATE.captures_iter(content) {
            let name = &caps[1];
            for candidate in [
                format!("src/{name}.rs"),
                format!("src/{name}/mod.rs"),
            ] {
                if known.contains(candidate.as_str()) {
                    targets.insert(candidate);
                    break;
                }
            }
        }
    } else if path.ends_with(".js")
        || path.ends_with(".jsx")
        || path.ends_with(".ts")
        || path.ends_with(".tsx")
    {
        for caps in JS_IMPORT.captures_iter(content) {
            let rel = &caps[1];
            let base = normalize(&join(dir, rel));
            for candidate in [
                base.clone(),
                format!("{base}.js"),
                format!("{base}.ts"),
                format!("{base}.jsx"),
                format!("{base}.tsx"),
                format!("{base}/index.js"),
                format!("{base}/index.ts"),
            ] {
                if known.contains(candidate.as_str()) {
                    targets.insert(candidate);
                    break;
                }
            }
        }
    }

    // A file importing itself is a scan artifact, not information
    targets.remove(path);
    targets.into_iter().collect()
}

fn join(dir: &str, rest: &str) -> String {
    if dir.is_empty() {
        rest.to_string()
    } else {
        format!("{dir}/{rest}")
    }
}

/// Collapse `.` and `..` components in a relative path.
fn normalize(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            p => parts.push(p),
        }
    }
    parts.join("/")
}
