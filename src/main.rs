//! WeeklyPulse - weekly GitHub activity metrics
//!
//! A CLI tool that collects the last week of commits, issues and
//! project-board tasks, scores contributors, awards badges and writes a
//! prompt from which an LLM can produce a weekly report.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (config, fetch failure, malformed activity, etc.)

mod analysis;
mod cli;
mod config;
mod error;
mod github;
mod models;
mod report;

use anyhow::{Context, Result};
use cli::{Args, OutputFormat};
use config::{Config, CONFIG_FILE};
use github::client::{ClientConfig, ProjectRef};
use github::GitHubClient;
use models::{ActivitySnapshot, Window};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Label used for the repository when reading a snapshot without `--repo`.
const SNAPSHOT_REPO_LABEL: &str = "(snapshot)";

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("WeeklyPulse v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run_report(args).await {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("Report failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .weeklypulse.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", CONFIG_FILE);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to set the repository, project board and output path.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run the complete collection, scoring and rendering workflow.
async fn run_report(args: Args) -> Result<()> {
    let start_time = Instant::now();

    let mut config = load_config(&args)?;
    config.merge_with_args(&args)?;

    let now = args.reference_time().map_err(anyhow::Error::msg)?;
    let window = Window::weekly(now);
    info!("Reporting window: {}", window.date_range());

    // Step 1: Collect activity
    let snapshot = collect_activity(&args, &config, &window).await?;

    if let Some(ref path) = args.save_snapshot {
        github::save_snapshot(&snapshot, path).await?;
    }

    // Step 2: Aggregate, score and award badges
    let repo = config
        .github
        .repo
        .clone()
        .unwrap_or_else(|| SNAPSHOT_REPO_LABEL.to_string());
    let report = analysis::build_report(&repo, &snapshot, window, config.report.previous_kpi)
        .context("Failed to aggregate activity")?;

    // Step 3: Render and save
    let output = match args.format {
        OutputFormat::Prompt => report::generate_prompt(&report),
        OutputFormat::Json => report::generate_json_report(&report)?,
    };

    let output_path = Path::new(&config.report.output);
    report::write_output(&output, output_path)
        .with_context(|| format!("Failed to write report to {}", output_path.display()))?;

    if !args.quiet {
        println!("\n📊 Weekly Summary ({}):", window.date_range());
        println!(
            "   Commits: {} (➕ {} | 🐛 {} | ♻️  {} | other {})",
            report.stats.total_commits(),
            report.stats.commits_added,
            report.stats.commits_fixed,
            report.stats.commits_refactored,
            report.stats.commits_other
        );
        println!(
            "   Issues: {} opened, {} closed",
            report.stats.issues_opened, report.stats.issues_closed
        );
        println!("   Tasks completed: {}", report.stats.tasks_completed);
        println!("   KPI: {}", report.kpi_score);
        println!("   Contributors: {}", report.contributors.len());
        println!("   Duration: {:.1}s", start_time.elapsed().as_secs_f64());
        println!("\n✅ Report saved to: {}", output_path.display());
    }

    Ok(())
}

/// Read the snapshot file or fetch from GitHub.
async fn collect_activity(args: &Args, config: &Config, window: &Window) -> Result<ActivitySnapshot> {
    if let Some(ref input) = args.input {
        info!("Reading activity from snapshot: {}", input.display());
        return github::load_snapshot(input).await;
    }

    let repo = config
        .github
        .repo
        .clone()
        .context("No repository given. Use --repo, WEEKLYPULSE_REPO or .weeklypulse.toml")?;

    if args.token.is_none() {
        warn!("No GITHUB_TOKEN set; requests are unauthenticated and project tasks will fail");
    }

    let client = GitHubClient::new(ClientConfig {
        api_url: config.github.api_url.clone(),
        repo: repo.clone(),
        token: args.token.clone(),
        timeout_seconds: config.github.timeout_seconds,
    })?;

    let project = match (config.github.project_owner(), config.github.project_number) {
        (Some(owner), Some(number)) => Some(ProjectRef { owner, number }),
        _ => None,
    };

    if !args.quiet {
        println!("📥 Fetching activity for {}", repo);
    }

    client
        .fetch_activity(window, project.as_ref(), !args.quiet)
        .await
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
