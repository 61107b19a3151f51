//! Activity aggregation.
//!
//! This module folds commits, issues and project tasks into repository-wide
//! counters and per-contributor statistics for a single run. One
//! [`Aggregator`] owns all mutable state of a run; feeding it the same
//! events twice counts them twice.

use crate::analysis::classifier::classify;
use crate::error::{EventKind, MetricsError};
use crate::models::{
    ActivitySnapshot, CommitCategory, CommitRecord, ContributorMap, ContributorStats,
    GlobalStats, IssueRecord, TaskRecord, Window, UNKNOWN_CONTRIBUTOR,
};
use chrono::{DateTime, NaiveDateTime, ParseResult, Utc};
use tracing::{debug, info, warn};

/// Points credited to the author of an issue closed inside the window.
const ISSUE_CLOSED_POINTS: f64 = 2.0;

/// Status labels that mark a project task as finished.
const DONE_LABELS: [&str; 2] = ["done", "completed"];

/// Per-run accumulator.
#[derive(Debug, Clone)]
pub struct Aggregator {
    window: Window,
    stats: GlobalStats,
    contributors: ContributorMap,
}

impl Aggregator {
    /// Start an empty run over `window`.
    pub fn new(window: Window) -> Self {
        Self {
            window,
            stats: GlobalStats::default(),
            contributors: ContributorMap::new(),
        }
    }

    pub fn stats(&self) -> &GlobalStats {
        &self.stats
    }

    pub fn contributors(&self) -> &ContributorMap {
        &self.contributors
    }

    /// Finish the run.
    pub fn into_parts(self) -> (GlobalStats, ContributorMap) {
        (self.stats, self.contributors)
    }

    fn contributor(&mut self, author: &str) -> &mut ContributorStats {
        self.contributors.entry(author.to_string()).or_default()
    }

    /// Record one commit and return its category.
    ///
    /// A missing or empty author is attributed to [`UNKNOWN_CONTRIBUTOR`].
    pub fn record_commit(
        &mut self,
        author: Option<&str>,
        message: &str,
        timestamp: DateTime<Utc>,
    ) -> CommitCategory {
        let category = classify(message);

        match category {
            CommitCategory::Fix => self.stats.commits_fixed += 1,
            CommitCategory::Add => self.stats.commits_added += 1,
            CommitCategory::Refactor => self.stats.commits_refactored += 1,
            CommitCategory::Other => self.stats.commits_other += 1,
        }

        let author = author
            .filter(|a| !a.is_empty())
            .unwrap_or(UNKNOWN_CONTRIBUTOR);
        let entry = self.contributor(author);

        entry.kpi += category.contributor_weight();
        match category {
            CommitCategory::Fix => entry.bug_fixes += 1,
            CommitCategory::Add => entry.add_commits += 1,
            CommitCategory::Refactor => entry.refactor_commits += 1,
            CommitCategory::Other => {}
        }
        entry.total_actions += 1;
        entry.active_days.insert(timestamp.date_naive());

        category
    }

    /// Count an issue opened inside the window. Nobody is credited.
    pub fn record_issue_opened(&mut self) {
        self.stats.issues_opened += 1;
    }

    /// Credit `author` for an issue closed inside the window.
    ///
    /// Callers filter by window first; see [`Aggregator::ingest_issues`].
    pub fn record_issue_closed(&mut self, author: &str, closed_at: DateTime<Utc>) {
        debug!("Issue by {} closed at {}", author, closed_at);

        self.stats.issues_closed += 1;

        let entry = self.contributor(author);
        entry.kpi += ISSUE_CLOSED_POINTS;
        entry.total_actions += 1;
    }

    /// Count a task if it was updated inside the window and carries a
    /// `done`/`completed` status. Returns whether it counted.
    pub fn record_task_completed(&mut self, updated_at: DateTime<Utc>, status_labels: &[String]) -> bool {
        if !self.window.contains(updated_at) {
            return false;
        }

        let done = status_labels
            .iter()
            .any(|label| DONE_LABELS.contains(&label.to_lowercase().as_str()));

        if done {
            self.stats.tasks_completed += 1;
        }
        done
    }

    /// Record a batch of commits.
    ///
    /// Every timestamp is parsed before anything is recorded, so a
    /// malformed commit leaves the accumulator untouched.
    pub fn ingest_commits(&mut self, commits: &[CommitRecord]) -> Result<(), MetricsError> {
        let parsed = commits
            .iter()
            .enumerate()
            .map(|(i, c)| parse_timestamp(&c.authored_at, EventKind::Commit, i, "authored_at"))
            .collect::<Result<Vec<_>, _>>()?;

        for (commit, timestamp) in commits.iter().zip(parsed) {
            self.record_commit(commit.author.as_deref(), &commit.message, timestamp);
        }

        info!("Aggregated {} commits", commits.len());
        Ok(())
    }

    /// Record a batch of issues.
    ///
    /// Opened counts when `created_at` falls in the window; closed counts
    /// (and credits the issue author) when `closed_at` does.
    pub fn ingest_issues(&mut self, issues: &[IssueRecord]) -> Result<(), MetricsError> {
        let mut parsed = Vec::with_capacity(issues.len());

        for (i, issue) in issues.iter().enumerate() {
            if issue.author.is_empty() {
                return Err(MetricsError::malformed(EventKind::Issue, i, "author", "empty login"));
            }
            let created = parse_timestamp(&issue.created_at, EventKind::Issue, i, "created_at")?;
            let closed = issue
                .closed_at
                .as_deref()
                .map(|raw| parse_timestamp(raw, EventKind::Issue, i, "closed_at"))
                .transpose()?;
            parsed.push((created, closed));
        }

        for (issue, (created, closed)) in issues.iter().zip(parsed) {
            if self.window.contains(created) {
                self.record_issue_opened();
            }

            if let Some(closed_at) = closed.filter(|ts| self.window.contains(*ts)) {
                self.record_issue_closed(&issue.author, closed_at);
                if issue.is_bug() {
                    self.stats.bug_issues_closed += 1;
                }
            }
        }

        info!(
            "Aggregated {} issues ({} opened, {} closed in window)",
            issues.len(),
            self.stats.issues_opened,
            self.stats.issues_closed
        );
        Ok(())
    }

    /// Record a batch of project tasks and return how many counted.
    ///
    /// Board data is not trusted: if any item is unreadable the whole
    /// batch counts as zero and a warning is logged.
    pub fn ingest_tasks(&mut self, tasks: &[TaskRecord]) -> u32 {
        let parsed = match parse_tasks(tasks) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Ignoring project tasks for this run: {}", e);
                return 0;
            }
        };

        let mut completed = 0;
        for (updated_at, labels) in parsed {
            if self.record_task_completed(updated_at, &labels) {
                completed += 1;
            }
        }

        info!("Aggregated {} tasks ({} completed)", tasks.len(), completed);
        completed
    }

    /// Record a whole snapshot: commits, then issues, then tasks.
    pub fn ingest(&mut self, snapshot: &ActivitySnapshot) -> Result<(), MetricsError> {
        self.ingest_commits(&snapshot.commits)?;
        self.ingest_issues(&snapshot.issues)?;
        self.ingest_tasks(&snapshot.tasks);
        Ok(())
    }
}

fn parse_tasks(tasks: &[TaskRecord]) -> Result<Vec<(DateTime<Utc>, Vec<String>)>, MetricsError> {
    tasks
        .iter()
        .enumerate()
        .map(|(i, task)| {
            let updated_at = parse_iso8601(&task.updated_at).map_err(|e| {
                MetricsError::unreliable(format!(
                    "task #{} has unreadable updated_at {:?}: {}",
                    i, task.updated_at, e
                ))
            })?;
            Ok((updated_at, task.status_labels()))
        })
        .collect()
}

/// Parse an ISO-8601 timestamp into UTC.
///
/// Timestamps without an offset are taken as UTC.
fn parse_iso8601(raw: &str) -> ParseResult<DateTime<Utc>> {
    let raw = raw.trim();
    match DateTime::parse_from_rfc3339(raw) {
        Ok(ts) => Ok(ts.with_timezone(&Utc)),
        Err(e) => NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| naive.and_utc())
            .map_err(|_| e),
    }
}

/// Parse an event timestamp, reporting failures as malformed events.
pub fn parse_timestamp(
    raw: &str,
    kind: EventKind,
    index: usize,
    field: &str,
) -> Result<DateTime<Utc>, MetricsError> {
    parse_iso8601(raw)
        .map_err(|e| MetricsError::malformed(kind, index, field, format!("{:?}: {}", raw, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FieldValue;
    use chrono::{Duration, NaiveDate, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap()
    }

    fn aggregator() -> Aggregator {
        Aggregator::new(Window::weekly(now()))
    }

    fn rfc3339(ts: DateTime<Utc>) -> String {
        ts.to_rfc3339()
    }

    fn commit(author: &str, message: &str, days_ago: i64) -> CommitRecord {
        CommitRecord {
            author: Some(author.to_string()),
            message: message.to_string(),
            authored_at: rfc3339(now() - Duration::days(days_ago)),
        }
    }

    fn task(days_ago: i64, labels: &[&str]) -> TaskRecord {
        TaskRecord {
            updated_at: rfc3339(now() - Duration::days(days_ago)),
            field_values: labels
                .iter()
                .map(|l| FieldValue {
                    name: Some(l.to_string()),
                    text: None,
                })
                .collect(),
        }
    }

    #[test]
    fn test_alice_week() {
        let mut agg = aggregator();
        agg.ingest_commits(&[
            commit("alice", "fix A", 1),
            commit("alice", "add B", 2),
            commit("alice", "refactor C", 3),
        ])
        .unwrap();

        let alice = &agg.contributors()["alice"];
        assert_eq!(alice.bug_fixes, 1);
        assert_eq!(alice.add_commits, 1);
        assert_eq!(alice.refactor_commits, 1);
        assert_eq!(alice.total_actions, 3);
        assert_eq!(alice.kpi, 4.5);
        assert_eq!(alice.active_days.len(), 3);

        let stats = agg.stats();
        assert_eq!(stats.commits_fixed, 1);
        assert_eq!(stats.commits_added, 1);
        assert_eq!(stats.commits_refactored, 1);
        assert_eq!(stats.commits_other, 0);
    }

    #[test]
    fn test_other_commit_scores_one() {
        let mut agg = aggregator();
        let category = agg.record_commit(Some("bob"), "Update docs", now());

        assert_eq!(category, CommitCategory::Other);
        assert_eq!(agg.stats().commits_other, 1);
        assert_eq!(agg.contributors()["bob"].kpi, 1.0);
    }

    #[test]
    fn test_missing_author_is_unknown() {
        let mut agg = aggregator();
        agg.record_commit(None, "fix build", now());
        agg.record_commit(Some(""), "tweak", now());

        assert_eq!(agg.contributors().len(), 1);
        assert_eq!(agg.contributors()[UNKNOWN_CONTRIBUTOR].total_actions, 2);
    }

    #[test]
    fn test_same_day_commits_count_one_active_day() {
        let mut agg = aggregator();
        let morning = Utc.with_ymd_and_hms(2025, 1, 14, 8, 0, 0).unwrap();
        agg.record_commit(Some("carol"), "one", morning);
        agg.record_commit(Some("carol"), "two", morning + Duration::hours(6));

        let carol = &agg.contributors()["carol"];
        assert_eq!(carol.total_actions, 2);
        assert_eq!(
            carol.active_days.iter().copied().collect::<Vec<_>>(),
            vec![NaiveDate::from_ymd_opt(2025, 1, 14).unwrap()]
        );
    }

    #[test]
    fn test_commit_order_does_not_matter() {
        let commits = vec![
            commit("alice", "fix A", 1),
            commit("bob", "add B", 2),
            commit("alice", "misc", 2),
            commit("bob", "refactor C", 4),
            commit("carol", "Enhancement D", 5),
        ];

        let mut forward = aggregator();
        forward.ingest_commits(&commits).unwrap();

        let mut reversed_commits = commits.clone();
        reversed_commits.reverse();
        let mut backward = aggregator();
        backward.ingest_commits(&reversed_commits).unwrap();

        assert_eq!(forward.stats(), backward.stats());
        assert_eq!(forward.contributors(), backward.contributors());
    }

    #[test]
    fn test_malformed_commit_timestamp_fails_without_side_effects() {
        let mut agg = aggregator();
        let mut bad = commit("alice", "fix", 1);
        bad.authored_at = "yesterday".to_string();

        let err = agg
            .ingest_commits(&[commit("bob", "add", 1), bad])
            .unwrap_err();

        match err {
            MetricsError::MalformedEvent { kind, index, field, .. } => {
                assert_eq!(kind, EventKind::Commit);
                assert_eq!(index, 1);
                assert_eq!(field, "authored_at");
            }
            other => panic!("unexpected error: {}", other),
        }
        assert!(agg.contributors().is_empty());
        assert_eq!(agg.stats().total_commits(), 0);
    }

    #[test]
    fn test_issue_window_boundaries() {
        let mut agg = aggregator();
        let issues = vec![
            IssueRecord {
                author: "old".to_string(),
                created_at: rfc3339(now() - Duration::days(20)),
                closed_at: Some(rfc3339(now() - Duration::days(8))),
                labels: vec![],
            },
            IssueRecord {
                author: "edge".to_string(),
                created_at: rfc3339(now() - Duration::days(20)),
                closed_at: Some(rfc3339(now() - Duration::days(7))),
                labels: vec!["Bug".to_string()],
            },
        ];

        agg.ingest_issues(&issues).unwrap();

        assert_eq!(agg.stats().issues_closed, 1);
        assert_eq!(agg.stats().bug_issues_closed, 1);
        assert_eq!(agg.stats().issues_opened, 0);
        assert!(!agg.contributors().contains_key("old"));
        assert_eq!(agg.contributors()["edge"].kpi, 2.0);
        assert_eq!(agg.contributors()["edge"].total_actions, 1);
    }

    #[test]
    fn test_issue_opened_credits_nobody() {
        let mut agg = aggregator();
        agg.ingest_issues(&[IssueRecord {
            author: "dave".to_string(),
            created_at: rfc3339(now() - Duration::days(1)),
            closed_at: None,
            labels: vec![],
        }])
        .unwrap();

        assert_eq!(agg.stats().issues_opened, 1);
        assert_eq!(agg.stats().issues_closed, 0);
        assert!(agg.contributors().is_empty());
    }

    #[test]
    fn test_issue_does_not_touch_active_days() {
        let mut agg = aggregator();
        agg.record_issue_closed("erin", now());

        let erin = &agg.contributors()["erin"];
        assert!(erin.active_days.is_empty());
        assert_eq!(erin.total_actions, 1);
    }

    #[test]
    fn test_malformed_closed_at_is_fatal() {
        let mut agg = aggregator();
        let err = agg
            .ingest_issues(&[IssueRecord {
                author: "dave".to_string(),
                created_at: rfc3339(now()),
                closed_at: Some("not a date".to_string()),
                labels: vec![],
            }])
            .unwrap_err();

        assert!(err.to_string().contains("closed_at"));
        assert_eq!(agg.stats().issues_opened, 0);
    }

    #[test]
    fn test_task_status_rules() {
        let mut agg = aggregator();
        let completed = agg.ingest_tasks(&[
            task(1, &["In Progress"]),
            task(1, &["Done"]),
            task(2, &["P1", "COMPLETED"]),
            task(9, &["Done"]),
        ]);

        assert_eq!(completed, 2);
        assert_eq!(agg.stats().tasks_completed, 2);
        assert!(agg.contributors().is_empty());
    }

    #[test]
    fn test_task_text_field_counts() {
        let mut agg = aggregator();
        let item = TaskRecord {
            updated_at: rfc3339(now()),
            field_values: vec![FieldValue {
                name: None,
                text: Some("done".to_string()),
            }],
        };

        assert_eq!(agg.ingest_tasks(&[item]), 1);
    }

    #[test]
    fn test_unreadable_task_batch_counts_zero() {
        let mut agg = aggregator();
        let mut broken = task(1, &["Done"]);
        broken.updated_at = "??".to_string();

        let completed = agg.ingest_tasks(&[task(1, &["Done"]), broken]);

        assert_eq!(completed, 0);
        assert_eq!(agg.stats().tasks_completed, 0);
    }

    #[test]
    fn test_kpi_never_decreases() {
        let mut agg = aggregator();
        let mut last = 0.0;
        for message in ["refactor", "fix", "docs", "refactor", "add"] {
            agg.record_commit(Some("frank"), message, now());
            let kpi = agg.contributors()["frank"].kpi;
            assert!(kpi >= last);
            last = kpi;
        }
        assert_eq!(last, 5.5);
    }

    #[test]
    fn test_parse_timestamp_normalizes_offset() {
        let ts = parse_timestamp("2025-01-15T14:00:00+02:00", EventKind::Commit, 0, "authored_at")
            .unwrap();
        assert_eq!(ts, now());
    }

    #[test]
    fn test_parse_timestamp_without_offset_is_utc() {
        let ts = parse_timestamp("2025-01-15T12:00:00", EventKind::Commit, 0, "authored_at")
            .unwrap();
        assert_eq!(ts, now());

        let ts = parse_timestamp("2025-01-15T12:00:00.250", EventKind::Issue, 0, "created_at")
            .unwrap();
        assert_eq!(ts, now() + Duration::milliseconds(250));

        assert!(parse_timestamp("2025-01-15", EventKind::Issue, 0, "created_at").is_err());
    }

    #[test]
    fn test_naive_snapshot_commit_is_aggregated() {
        let mut agg = aggregator();
        let mut naive = commit("alice", "fix A", 1);
        naive.authored_at = "2025-01-14T09:00:00".to_string();

        agg.ingest_commits(&[naive]).unwrap();

        assert_eq!(agg.stats().commits_fixed, 1);
        assert_eq!(
            agg.contributors()["alice"].active_days.iter().copied().collect::<Vec<_>>(),
            vec![NaiveDate::from_ymd_opt(2025, 1, 14).unwrap()]
        );
    }

    #[test]
    fn test_task_timestamps_parse_like_events() {
        let mut agg = aggregator();
        let mut padded = task(0, &["Done"]);
        padded.updated_at = " 2025-01-15T11:00:00Z ".to_string();
        let mut naive = task(0, &["Done"]);
        naive.updated_at = "2025-01-14T11:00:00".to_string();

        assert_eq!(agg.ingest_tasks(&[padded, naive]), 2);
    }
}
