//! Commit message classification.

use crate::models::CommitCategory;

/// Classify a commit message.
///
/// First match wins: `fix`, then `add`/`enhancement`, then `refactor`.
/// Matching is case-insensitive substring containment, so "prefix"
/// counts as a fix and "address" as an addition.
pub fn classify(message: &str) -> CommitCategory {
    let msg = message.to_lowercase();

    if msg.contains("fix") {
        CommitCategory::Fix
    } else if msg.contains("add") || msg.contains("enhancement") {
        CommitCategory::Add
    } else if msg.contains("refactor") {
        CommitCategory::Refactor
    } else {
        CommitCategory::Other
    }
}
