//! GitHub data collection.
//!
//! This module fetches commits, issues and project-board items and turns
//! them into the records the metrics engine consumes. A previously saved
//! snapshot file can stand in for the network.

pub mod client;
pub mod snapshot;

pub use client::GitHubClient;
pub use snapshot::{load_snapshot, save_snapshot};

/// Split a repository reference into `(owner, name)`.
///
/// Accepts `owner/name` as well as HTTPS and SSH GitHub URLs.
pub fn parse_repo_slug(repo: &str) -> Option<(String, String)> {
    let repo = repo.trim().trim_end_matches('/').trim_end_matches(".git");

    let rest = repo
        .strip_prefix("https://github.com/")
        .or_else(|| repo.strip_prefix("git@github.com:"))
        .unwrap_or(repo);

    if rest.contains("://") {
        return None;
    }

    let mut parts = rest.split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty() => {
            Some((owner.to_string(), name.to_string()))
        }
        _ => None,
    }
}

/// Canonical `owner/name` form of a repository reference.
pub fn normalize_repo(repo: &str) -> Option<String> {
    parse_repo_slug(repo).map(|(owner, name)| format!("{}/{}", owner, name))
}
