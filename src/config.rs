//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.weeklypulse.toml` files.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name.
pub const CONFIG_FILE: &str = ".weeklypulse.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// GitHub settings.
    #[serde(default)]
    pub github: GitHubConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// Where to collect activity from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// Repository as `owner/name`. URL forms are normalized on load.
    #[serde(default)]
    pub repo: Option<String>,

    /// Login owning the Projects V2 board. Defaults to the repo owner.
    #[serde(default)]
    pub owner: Option<String>,

    /// Projects V2 board number. Tasks are skipped when unset.
    #[serde(default)]
    pub project_number: Option<u32>,

    /// API base URL.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            repo: None,
            owner: None,
            project_number: None,
            api_url: default_api_url(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl GitHubConfig {
    /// Owner of the project board: explicit, else the repository owner.
    pub fn project_owner(&self) -> Option<String> {
        self.owner.clone().or_else(|| {
            self.repo
                .as_deref()
                .and_then(crate::github::parse_repo_slug)
                .map(|(owner, _)| owner)
        })
    }
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Last week's KPI, shown next to this week's.
    #[serde(default)]
    pub previous_kpi: Option<f64>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            previous_kpi: None,
        }
    }
}

fn default_output() -> String {
    "prompt.txt".to_string()
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.github.repo = config
            .github
            .repo
            .as_deref()
            .map(checked_repo)
            .transpose()
            .with_context(|| format!("Invalid [github] repo in {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were actually given.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) -> Result<()> {
        if let Some(ref repo) = args.repo {
            self.github.repo = Some(checked_repo(repo)?);
        }
        if let Some(ref owner) = args.owner {
            self.github.owner = Some(owner.clone());
        }
        if let Some(number) = args.project_number {
            self.github.project_number = Some(number);
        }
        if let Some(ref api_url) = args.api_url {
            self.github.api_url = api_url.trim_end_matches('/').to_string();
        }
        if let Some(timeout) = args.timeout {
            self.github.timeout_seconds = timeout;
        }

        if let Some(ref output) = args.output {
            self.report.output = output.display().to_string();
        }
        if let Some(previous) = args.previous_kpi {
            self.report.previous_kpi = Some(previous);
        }

        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

fn checked_repo(repo: &str) -> Result<String> {
    match crate::github::normalize_repo(repo) {
        Some(slug) => Ok(slug),
        None => bail!("Repository must look like 'owner/name' or a GitHub URL, got '{}'", repo),
    }
}
