//! Data models for the activity metrics engine.
//!
//! This module contains the input records handed over by the fetch
//! layer, the per-run accumulators, and the final report bundle.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Identity used when a commit carries no author.
pub const UNKNOWN_CONTRIBUTOR: &str = "Unknown";

/// Length of the reporting window in days.
pub const WINDOW_DAYS: i64 = 7;

/// Category of a commit, derived from its message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommitCategory {
    Fix,
    Add,
    Refactor,
    Other,
}

impl fmt::Display for CommitCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommitCategory::Fix => write!(f, "fix"),
            CommitCategory::Add => write!(f, "add"),
            CommitCategory::Refactor => write!(f, "refactor"),
            CommitCategory::Other => write!(f, "other"),
        }
    }
}

impl CommitCategory {
    /// Points credited to the commit author.
    ///
    /// Refactors earn nothing. These weights are separate from the
    /// global score in [`crate::analysis::kpi_score`].
    pub fn contributor_weight(&self) -> f64 {
        match self {
            CommitCategory::Fix => 2.5,
            CommitCategory::Add => 2.0,
            CommitCategory::Refactor => 0.0,
            CommitCategory::Other => 1.0,
        }
    }
}

/// A commit as delivered by the fetch layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitRecord {
    /// Author display name, if GitHub knows one.
    #[serde(default)]
    pub author: Option<String>,
    /// Full commit message.
    pub message: String,
    /// ISO-8601 authoring timestamp.
    pub authored_at: String,
}

/// An issue as delivered by the fetch layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueRecord {
    /// Login of the issue author.
    pub author: String,
    /// ISO-8601 creation timestamp.
    pub created_at: String,
    /// ISO-8601 closing timestamp, absent while the issue is open.
    #[serde(default)]
    pub closed_at: Option<String>,
    /// Label names.
    #[serde(default)]
    pub labels: Vec<String>,
}

impl IssueRecord {
    /// Whether any label is `bug`, ignoring case.
    pub fn is_bug(&self) -> bool {
        self.labels.iter().any(|l| l.eq_ignore_ascii_case("bug"))
    }
}

/// One field value of a project item. Single-select fields carry a
/// `name`, text fields carry `text`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldValue {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

impl FieldValue {
    /// Lower-cased status label: the name, else the text, else empty.
    pub fn status_label(&self) -> String {
        self.name
            .as_deref()
            .filter(|n| !n.is_empty())
            .or(self.text.as_deref())
            .unwrap_or("")
            .to_lowercase()
    }
}

/// A project-board item as delivered by the fetch layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    /// ISO-8601 last-update timestamp.
    pub updated_at: String,
    #[serde(default)]
    pub field_values: Vec<FieldValue>,
}

impl TaskRecord {
    pub fn status_labels(&self) -> Vec<String> {
        self.field_values.iter().map(FieldValue::status_label).collect()
    }
}

/// Everything fetched for one run. Also the format of `--input` files.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivitySnapshot {
    #[serde(default)]
    pub commits: Vec<CommitRecord>,
    #[serde(default)]
    pub issues: Vec<IssueRecord>,
    #[serde(default)]
    pub tasks: Vec<TaskRecord>,
}

/// Trailing time window, inclusive at both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Window {
    /// The `days`-long window ending at `now`.
    pub fn trailing(now: DateTime<Utc>, days: i64) -> Self {
        Self {
            start: now - Duration::days(days),
            end: now,
        }
    }

    /// The standard weekly window.
    pub fn weekly(now: DateTime<Utc>) -> Self {
        Self::trailing(now, WINDOW_DAYS)
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts <= self.end
    }

    /// Human-readable date range, e.g. `2025-01-08 to 2025-01-15`.
    pub fn date_range(&self) -> String {
        format!(
            "{} to {}",
            self.start.date_naive(),
            self.end.date_naive()
        )
    }
}

/// Repository-wide counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalStats {
    pub commits_added: u32,
    pub commits_fixed: u32,
    pub commits_refactored: u32,
    pub commits_other: u32,
    pub issues_opened: u32,
    pub issues_closed: u32,
    /// Closed issues labelled `bug`. Reported only, not scored.
    pub bug_issues_closed: u32,
    pub tasks_completed: u32,
}

impl GlobalStats {
    pub fn total_commits(&self) -> u32 {
        self.commits_added + self.commits_fixed + self.commits_refactored + self.commits_other
    }
}

/// Per-contributor statistics for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContributorStats {
    /// Accumulated contributor KPI. Never decreases.
    pub kpi: f64,
    pub bug_fixes: u32,
    pub add_commits: u32,
    pub refactor_commits: u32,
    pub total_actions: u32,
    /// Distinct days with at least one commit.
    pub active_days: BTreeSet<NaiveDate>,
}

/// Contributors in first-seen order.
pub type ContributorMap = IndexMap<String, ContributorStats>;

/// Award given to a contributor for the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Badge {
    #[serde(rename = "Top Contributor")]
    TopContributor,
    #[serde(rename = "Bug Squasher")]
    BugSquasher,
    #[serde(rename = "Most Active")]
    MostActive,
    #[serde(rename = "Feature Creator")]
    FeatureCreator,
    #[serde(rename = "Code Refactorer")]
    CodeRefactorer,
    #[serde(rename = "Consistent Contributor")]
    ConsistentContributor,
}

impl Badge {
    pub fn name(&self) -> &'static str {
        match self {
            Badge::TopContributor => "Top Contributor",
            Badge::BugSquasher => "Bug Squasher",
            Badge::MostActive => "Most Active",
            Badge::FeatureCreator => "Feature Creator",
            Badge::CodeRefactorer => "Code Refactorer",
            Badge::ConsistentContributor => "Consistent Contributor",
        }
    }
}

impl fmt::Display for Badge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Badges per contributor, in award order.
pub type BadgeMap = IndexMap<String, Vec<Badge>>;

/// The complete output of one run, ready for rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityReport {
    /// `owner/name` of the repository.
    pub repo: String,
    /// When the report was produced.
    pub generated_at: DateTime<Utc>,
    pub window: Window,
    pub stats: GlobalStats,
    pub contributors: ContributorMap,
    /// Global KPI for the window.
    pub kpi_score: f64,
    /// KPI of the previous week, when the caller knows it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_kpi: Option<f64>,
    pub badges: BadgeMap,
}
