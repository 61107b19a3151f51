//! Activity snapshot files.
//!
//! A snapshot is the JSON form of [`ActivitySnapshot`]. Saving one after a
//! fetch makes a run reproducible offline with `--input`.

use crate::models::ActivitySnapshot;
use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

/// Read a snapshot from disk.
pub async fn load_snapshot(path: &Path) -> Result<ActivitySnapshot> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read snapshot: {}", path.display()))?;

    let snapshot: ActivitySnapshot = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse snapshot: {}", path.display()))?;

    info!(
        "Loaded snapshot with {} commits, {} issues, {} tasks",
        snapshot.commits.len(),
        snapshot.issues.len(),
        snapshot.tasks.len()
    );
    Ok(snapshot)
}

/// Write a snapshot to disk as pretty JSON.
pub async fn save_snapshot(snapshot: &ActivitySnapshot, path: &Path) -> Result<()> {
    let content = serde_json::to_string_pretty(snapshot)?;
    tokio::fs::write(path, content)
        .await
        .with_context(|| format!("Failed to write snapshot: {}", path.display()))?;

    info!("Saved snapshot to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CommitRecord, FieldValue, TaskRecord};

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        let snapshot = ActivitySnapshot {
            commits: vec![CommitRecord {
                author: Some("alice".to_string()),
                message: "add B".to_string(),
                authored_at: "2025-01-14T09:00:00Z".to_string(),
            }],
            issues: vec![],
            tasks: vec![TaskRecord {
                updated_at: "2025-01-14T09:00:00Z".to_string(),
                field_values: vec![FieldValue {
                    name: Some("Done".to_string()),
                    text: None,
                }],
            }],
        };

        tokio_test::block_on(save_snapshot(&snapshot, &path)).unwrap();
        let loaded = tokio_test::block_on(load_snapshot(&path)).unwrap();

        assert_eq!(loaded, snapshot);
    }

    #[test]
    fn test_load_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = tokio_test::block_on(load_snapshot(&path)).unwrap_err();
        assert!(err.to_string().contains("Failed to parse snapshot"));
    }

    #[test]
    fn test_load_missing_file() {
        let result = tokio_test::block_on(load_snapshot(Path::new("/nonexistent/snapshot.json")));
        assert!(result.is_err());
    }
}
