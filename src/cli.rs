//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use chrono::{DateTime, Utc};
use clap::Parser;
use std::path::PathBuf;

/// WeeklyPulse - weekly GitHub activity metrics and report prompts
///
/// Collects the last 7 days of commits, issues and project-board tasks,
/// scores contributors, awards badges and writes a prompt for an LLM to
/// turn into a weekly report.
///
/// Examples:
///   weeklypulse --repo owner/name
///   weeklypulse --repo owner/name --project-number 4 --previous-kpi 20
///   weeklypulse --repo owner/name --input snapshot.json --as-of 2025-01-15T12:00:00Z
///   weeklypulse --repo owner/name --format json --output report.json
///   weeklypulse --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Repository to report on (owner/name or GitHub URL)
    ///
    /// Can also be set via WEEKLYPULSE_REPO env var or .weeklypulse.toml.
    #[arg(short, long, value_name = "REPO", env = "WEEKLYPULSE_REPO")]
    pub repo: Option<String>,

    /// Login owning the Projects V2 board (defaults to the repo owner)
    #[arg(long, value_name = "LOGIN")]
    pub owner: Option<String>,

    /// Projects V2 board number to count completed tasks from
    #[arg(short, long, value_name = "NUM")]
    pub project_number: Option<u32>,

    /// GitHub token
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// GitHub API base URL
    #[arg(long, value_name = "URL")]
    pub api_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Read activity from a snapshot file instead of GitHub
    #[arg(short, long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Save the fetched activity as a snapshot file
    #[arg(long, value_name = "FILE", conflicts_with = "input")]
    pub save_snapshot: Option<PathBuf>,

    /// End of the reporting window (RFC 3339). Defaults to now
    #[arg(long, value_name = "TIMESTAMP")]
    pub as_of: Option<String>,

    /// Last week's KPI, for comparison in the report
    #[arg(long, value_name = "KPI")]
    pub previous_kpi: Option<f64>,

    /// Output file path for the report
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (prompt, json)
    #[arg(long, default_value = "prompt", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Path to configuration file
    ///
    /// If not specified, looks for .weeklypulse.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .weeklypulse.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// LLM prompt text (default)
    #[default]
    Prompt,
    /// JSON statistics bundle
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if let Some(ref repo) = self.repo {
            if crate::github::parse_repo_slug(repo).is_none() {
                return Err(format!(
                    "Repository must look like 'owner/name' or a GitHub URL, got '{}'",
                    repo
                ));
            }
        }

        if let Some(ref api_url) = self.api_url {
            if !api_url.starts_with("http://") && !api_url.starts_with("https://") {
                return Err("API URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if self.as_of.is_some() {
            self.reference_time()?;
        }

        if let Some(previous) = self.previous_kpi {
            if !previous.is_finite() || previous < 0.0 {
                return Err("Previous KPI must be a non-negative number".to_string());
            }
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref input) = self.input {
            if !input.is_file() {
                return Err(format!("Input file does not exist: {}", input.display()));
            }
        }

        Ok(())
    }

    /// The run's reference instant: `--as-of`, or now.
    pub fn reference_time(&self) -> Result<DateTime<Utc>, String> {
        match self.as_of {
            Some(ref raw) => DateTime::parse_from_rfc3339(raw)
                .map(|ts| ts.with_timezone(&Utc))
                .map_err(|e| format!("Invalid --as-of timestamp '{}': {}", raw, e)),
            None => Ok(Utc::now()),
        }
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
