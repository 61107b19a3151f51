//! GitHub REST and GraphQL client.
//!
//! One request per resource, no pagination and no retries. Commit and
//! issue failures abort the run; project-board failures only cost the
//! task count.

use crate::error::{EventKind, MetricsError};
use crate::models::{ActivitySnapshot, CommitRecord, FieldValue, IssueRecord, TaskRecord, Window};
use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::RequestBuilder;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Connection settings for the client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base API URL, e.g. `https://api.github.com`.
    pub api_url: String,
    /// Repository as `owner/name`.
    pub repo: String,
    /// Personal access token.
    pub token: Option<String>,
    pub timeout_seconds: u64,
}

/// Which Projects V2 board to read tasks from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRef {
    /// User login owning the project.
    pub owner: String,
    pub number: u32,
}

#[derive(Debug, Deserialize)]
struct ApiCommit {
    commit: ApiCommitDetail,
}

#[derive(Debug, Deserialize)]
struct ApiCommitDetail {
    message: String,
    #[serde(default)]
    author: Option<ApiGitActor>,
    #[serde(default)]
    committer: Option<ApiGitActor>,
}

#[derive(Debug, Deserialize)]
struct ApiGitActor {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiIssue {
    #[serde(default)]
    user: Option<ApiUser>,
    created_at: String,
    #[serde(default)]
    closed_at: Option<String>,
    #[serde(default)]
    labels: Vec<ApiLabel>,
}

#[derive(Debug, Deserialize)]
struct ApiUser {
    login: String,
}

#[derive(Debug, Deserialize)]
struct ApiLabel {
    name: String,
}

const PROJECT_ITEMS_QUERY: &str = r#"
query($owner: String!, $number: Int!) {
  user(login: $owner) {
    projectV2(number: $number) {
      items(first: 50) {
        nodes {
          updatedAt
          fieldValues(first: 10) {
            nodes {
              ... on ProjectV2ItemFieldSingleSelectValue {
                name
              }
              ... on ProjectV2ItemFieldTextValue {
                text
              }
            }
          }
        }
      }
    }
  }
}
"#;

/// Client for the handful of GitHub endpoints we need.
pub struct GitHubClient {
    config: ClientConfig,
    http_client: reqwest::Client,
}

impl GitHubClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        info!("Initializing GitHub client for {} at {}", config.repo, config.api_url);

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("weeklypulse/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            config,
            http_client,
        })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header("Accept", "application/vnd.github+json");
        match self.config.token {
            Some(ref token) => request.header("Authorization", format!("token {}", token)),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder, what: &str) -> Result<Value> {
        let response = self.authorize(request).send().await.map_err(|e| {
            if e.is_timeout() {
                anyhow::anyhow!(
                    "Request for {} timed out after {}s",
                    what,
                    self.config.timeout_seconds
                )
            } else if e.is_connect() {
                anyhow::anyhow!("Cannot connect to GitHub at {}", self.config.api_url)
            } else {
                anyhow::anyhow!("Failed to request {}: {}", what, e)
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("GitHub API error {} for {}: {}", status, what, body));
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse GitHub response for {}", what))
    }

    /// Commits authored since `since`.
    pub async fn fetch_commits(&self, since: DateTime<Utc>) -> Result<Vec<CommitRecord>> {
        let url = format!("{}/repos/{}/commits", self.config.api_url, self.config.repo);
        let request = self
            .http_client
            .get(&url)
            .query(&[("since", since.to_rfc3339_opts(SecondsFormat::Secs, true))]);

        let body = self.send(request, "commits").await?;
        let commits: Vec<ApiCommit> =
            serde_json::from_value(body).context("Unexpected shape of commits response")?;
        debug!("Fetched {} commits", commits.len());

        let records = commits
            .into_iter()
            .enumerate()
            .map(|(i, c)| commit_record(i, c))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Issues (open and closed) updated since `since`.
    pub async fn fetch_issues(&self, since: DateTime<Utc>) -> Result<Vec<IssueRecord>> {
        let url = format!("{}/repos/{}/issues", self.config.api_url, self.config.repo);
        let request = self.http_client.get(&url).query(&[
            ("state", "all".to_string()),
            ("since", since.to_rfc3339_opts(SecondsFormat::Secs, true)),
        ]);

        let body = self.send(request, "issues").await?;
        let issues: Vec<ApiIssue> =
            serde_json::from_value(body).context("Unexpected shape of issues response")?;
        debug!("Fetched {} issues", issues.len());

        let records = issues
            .into_iter()
            .enumerate()
            .map(|(i, issue)| issue_record(i, issue))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Items of a Projects V2 board.
    pub async fn fetch_project_tasks(&self, project: &ProjectRef) -> Result<Vec<TaskRecord>> {
        let url = format!("{}/graphql", self.config.api_url);
        let request = self.http_client.post(&url).json(&json!({
            "query": PROJECT_ITEMS_QUERY,
            "variables": { "owner": project.owner, "number": project.number },
        }));

        let body = self.send(request, "project items").await?;
        let tasks = parse_project_items(&body)?;
        debug!("Fetched {} project items", tasks.len());
        Ok(tasks)
    }

    /// Fetch everything for the window.
    ///
    /// The three requests run concurrently. A failed task query is logged
    /// and yields no tasks.
    pub async fn fetch_activity(
        &self,
        window: &Window,
        project: Option<&ProjectRef>,
        show_progress: bool,
    ) -> Result<ActivitySnapshot> {
        let spinner = if show_progress {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} [{elapsed_precise}] {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb.set_message(format!("Fetching activity for {}", self.config.repo));
            pb.enable_steady_tick(Duration::from_millis(120));
            Some(pb)
        } else {
            None
        };

        let tasks = async {
            match project {
                Some(project) => self.fetch_project_tasks(project).await,
                None => {
                    info!("No project board configured, skipping tasks");
                    Ok(Vec::new())
                }
            }
        };

        let (commits, issues, tasks) = futures::join!(
            self.fetch_commits(window.start),
            self.fetch_issues(window.start),
            tasks
        );

        if let Some(pb) = spinner {
            pb.finish_and_clear();
        }

        let tasks = tasks.unwrap_or_else(|e| {
            warn!("Error fetching project tasks: {:#}", e);
            Vec::new()
        });

        Ok(ActivitySnapshot {
            commits: commits?,
            issues: issues?,
            tasks,
        })
    }
}

fn commit_record(index: usize, commit: ApiCommit) -> Result<CommitRecord, MetricsError> {
    let detail = commit.commit;

    let authored_at = detail
        .author
        .as_ref()
        .and_then(|a| a.date.clone())
        .or_else(|| detail.committer.as_ref().and_then(|c| c.date.clone()))
        .ok_or_else(|| {
            MetricsError::malformed(EventKind::Commit, index, "commit.author.date", "missing")
        })?;

    Ok(CommitRecord {
        author: detail.author.and_then(|a| a.name),
        message: detail.message,
        authored_at,
    })
}

fn issue_record(index: usize, issue: ApiIssue) -> Result<IssueRecord, MetricsError> {
    let author = issue
        .user
        .map(|u| u.login)
        .ok_or_else(|| MetricsError::malformed(EventKind::Issue, index, "user.login", "missing"))?;

    Ok(IssueRecord {
        author,
        created_at: issue.created_at,
        closed_at: issue.closed_at,
        labels: issue.labels.into_iter().map(|l| l.name).collect(),
    })
}

/// Read task records out of a Projects V2 GraphQL response.
pub fn parse_project_items(body: &Value) -> Result<Vec<TaskRecord>, MetricsError> {
    if let Some(errors) = body.get("errors") {
        return Err(MetricsError::unreliable(format!("GraphQL errors: {}", errors)));
    }

    let nodes = body
        .pointer("/data/user/projectV2/items/nodes")
        .and_then(Value::as_array)
        .ok_or_else(|| MetricsError::unreliable("missing data.user.projectV2.items.nodes"))?;

    nodes
        .iter()
        .enumerate()
        .map(|(i, node)| {
            let updated_at = node
                .get("updatedAt")
                .and_then(Value::as_str)
                .ok_or_else(|| MetricsError::unreliable(format!("item #{} has no updatedAt", i)))?;

            let field_values = node
                .pointer("/fieldValues/nodes")
                .and_then(Value::as_array)
                .ok_or_else(|| {
                    MetricsError::unreliable(format!("item #{} has no fieldValues.nodes", i))
                })?
                .iter()
                .map(|field| FieldValue {
                    name: field.get("name").and_then(Value::as_str).map(String::from),
                    text: field.get("text").and_then(Value::as_str).map(String::from),
                })
                .collect();

            Ok(TaskRecord {
                updated_at: updated_at.to_string(),
                field_values,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_record_from_api() {
        let json = r#"[
            {"sha": "abc", "commit": {"message": "Fix RX overrun",
              "author": {"name": "Amen", "email": "a@x", "date": "2025-01-14T09:00:00Z"},
              "committer": {"name": "GitHub", "date": "2025-01-14T09:05:00Z"}}},
            {"sha": "def", "commit": {"message": "Merge", "author": null,
              "committer": {"name": "GitHub", "date": "2025-01-13T10:00:00Z"}}}
        ]"#;
        let commits: Vec<ApiCommit> = serde_json::from_str(json).unwrap();
        let records: Vec<CommitRecord> = commits
            .into_iter()
            .enumerate()
            .map(|(i, c)| commit_record(i, c).unwrap())
            .collect();

        assert_eq!(records[0].author.as_deref(), Some("Amen"));
        assert_eq!(records[0].authored_at, "2025-01-14T09:00:00Z");
        assert!(records[1].author.is_none());
        assert_eq!(records[1].authored_at, "2025-01-13T10:00:00Z");
    }

    #[test]
    fn test_commit_without_any_date_is_malformed() {
        let commit: ApiCommit =
            serde_json::from_str(r#"{"commit": {"message": "x", "author": null}}"#).unwrap();
        let err = commit_record(4, commit).unwrap_err();
        assert!(err.to_string().contains("commit event #4"));
    }

    #[test]
    fn test_issue_record_from_api() {
        let json = r#"{"number": 7, "user": {"login": "octo"},
            "created_at": "2025-01-10T00:00:00Z", "closed_at": null,
            "labels": [{"name": "bug"}, {"name": "uart"}]}"#;
        let issue: ApiIssue = serde_json::from_str(json).unwrap();
        let record = issue_record(0, issue).unwrap();

        assert_eq!(record.author, "octo");
        assert!(record.closed_at.is_none());
        assert_eq!(record.labels, vec!["bug", "uart"]);
    }

    #[test]
    fn test_issue_without_user_is_malformed() {
        let issue: ApiIssue =
            serde_json::from_str(r#"{"created_at": "2025-01-10T00:00:00Z"}"#).unwrap();
        assert!(issue_record(0, issue).is_err());
    }

    #[test]
    fn test_parse_project_items() {
        let body = json!({
            "data": {"user": {"projectV2": {"items": {"nodes": [
                {"updatedAt": "2025-01-14T00:00:00Z", "fieldValues": {"nodes": [
                    {"name": "Done"}, {}, {"text": "notes"}
                ]}},
                {"updatedAt": "2025-01-13T00:00:00Z", "fieldValues": {"nodes": []}}
            ]}}}}
        });

        let tasks = parse_project_items(&body).unwrap();

        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].status_labels(), vec!["done", "", "notes"]);
        assert!(tasks[1].field_values.is_empty());
    }

    #[test]
    fn test_parse_project_items_shape_mismatch() {
        let body = json!({"data": {"user": null}});
        assert!(matches!(
            parse_project_items(&body),
            Err(MetricsError::UnreliableSource(_))
        ));

        let errors = json!({"errors": [{"message": "Could not resolve to a User"}]});
        assert!(parse_project_items(&errors).is_err());
    }
}
