//! Weekly report prompt generation.
//!
//! This module renders an [`ActivityReport`] into the prompt handed to a
//! language model, or into a JSON document for other tooling.

use crate::models::{ActivityReport, BadgeMap, ContributorMap, GlobalStats, Window};
use anyhow::Result;
use std::io::Write;
use std::path::Path;

/// Generate the complete report prompt.
pub fn generate_prompt(report: &ActivityReport) -> String {
    let mut output = String::new();

    output.push_str(
        "You are an expert project manager generating a weekly GitHub repository report.\n\n",
    );

    output.push_str(&generate_structure_section());
    output.push_str(&generate_summary_section(&report.repo, &report.window, &report.stats));
    output.push_str(&generate_badges_section(&report.badges));
    output.push_str(&generate_contributors_section(&report.contributors, &report.badges));
    output.push_str(&generate_kpi_section(report.kpi_score, report.previous_kpi));

    output.push_str(
        "Please generate a professional, concise, and clear weekly report in Markdown format \
         following the above report structure.\n",
    );

    output
}

/// Describe the sections the model should produce.
fn generate_structure_section() -> String {
    let mut section = String::new();

    section.push_str("Report Structure:\n");
    section.push_str("• Header with the date range (week)\n");
    section.push_str("• Technical achievements (based on commits)\n");
    section.push_str("• Bugs resolved (closed issues of type bug)\n");
    section.push_str("• Backlog tasks (from GitHub Projects)\n");
    section.push_str("• KPI Score and assigned badges\n\n");

    section
}

fn generate_summary_section(repo: &str, window: &Window, stats: &GlobalStats) -> String {
    let mut section = String::new();

    section.push_str(&format!("Repository: {}\n\n", repo));
    section.push_str(&format!(
        "Summary of the past week ({}):\n",
        window.date_range()
    ));
    section.push_str(&format!("- Commits Added: {}\n", stats.commits_added));
    section.push_str(&format!("- Commits Fixed: {}\n", stats.commits_fixed));
    section.push_str(&format!("- Refactor Commits: {}\n", stats.commits_refactored));
    section.push_str(&format!("- Other Commits: {}\n\n", stats.commits_other));

    section.push_str(&format!("- Issues Opened: {}\n", stats.issues_opened));
    section.push_str(&format!("- Issues Closed: {}\n", stats.issues_closed));
    section.push_str(&format!("- Bug Issues Closed: {}\n\n", stats.bug_issues_closed));

    section.push_str(&format!(
        "- Tasks Completed from Backlog: {}\n\n",
        stats.tasks_completed
    ));

    section
}

fn generate_badges_section(badges: &BadgeMap) -> String {
    let mut section = String::new();

    section.push_str("Contributor Badges:\n");

    if badges.is_empty() {
        section.push_str("No badges assigned\n\n");
        return section;
    }

    for (contributor, list) in badges {
        section.push_str(&format!("- {}: {}\n", contributor, join_badges(list)));
    }
    section.push('\n');

    section
}

fn generate_contributors_section(contributors: &ContributorMap, badges: &BadgeMap) -> String {
    let mut section = String::new();

    section.push_str("Individual Contributor KPI Scores and Badges:\n");

    if contributors.is_empty() {
        section.push_str("No contributor activity this week\n\n");
        return section;
    }

    for (contributor, stats) in contributors {
        let earned = badges
            .get(contributor)
            .map(|list| join_badges(list))
            .unwrap_or_else(|| "None".to_string());

        section.push_str(&format!(
            "- **{}**: KPI Score = {:.2}, Badges = {}\n",
            contributor, stats.kpi, earned
        ));
    }
    section.push('\n');

    section
}

fn generate_kpi_section(kpi_score: f64, previous_kpi: Option<f64>) -> String {
    let mut section = String::new();

    section.push_str("KPI Scores:\n");
    section.push_str(&format!("- Current Week KPI: {}\n", kpi_score));
    match previous_kpi {
        Some(previous) => {
            section.push_str(&format!("- Previous Week KPI: {}\n", previous));
            section.push_str(&format!("- Change: {:+}\n\n", kpi_score - previous));
        }
        None => section.push_str("- Previous Week KPI: not available\n\n"),
    }

    section
}

fn join_badges(list: &[crate::models::Badge]) -> String {
    list.iter()
        .map(|b| b.name())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Generate a JSON report.
pub fn generate_json_report(report: &ActivityReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Write rendered output to a file.
pub fn write_output(content: &str, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = std::fs::File::create(path)?;
    file.write_all(content.as_bytes())?;

    Ok(())
}
