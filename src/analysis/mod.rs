//! Metrics engine.
//!
//! Classification, aggregation, scoring and badge assignment. Nothing in
//! here does I/O; the caller hands over records and gets statistics back.

pub mod aggregator;
pub mod badges;
pub mod classifier;
pub mod scorer;

pub use aggregator::Aggregator;
pub use badges::assign_badges;
pub use scorer::kpi_score;

use crate::error::MetricsError;
use crate::models::{ActivityReport, ActivitySnapshot, Window};
use chrono::Utc;
use tracing::debug;

/// Run the whole engine over one snapshot.
pub fn build_report(
    repo: &str,
    snapshot: &ActivitySnapshot,
    window: Window,
    previous_kpi: Option<f64>,
) -> Result<ActivityReport, MetricsError> {
    let mut aggregator = Aggregator::new(window);
    aggregator.ingest(snapshot)?;
    debug!(
        "{} commits from {} contributors",
        aggregator.stats().total_commits(),
        aggregator.contributors().len()
    );

    let (stats, contributors) = aggregator.into_parts();
    let kpi_score = kpi_score(&stats);
    let badges = assign_badges(&contributors);

    Ok(ActivityReport {
        repo: repo.to_string(),
        generated_at: Utc::now(),
        window,
        stats,
        contributors,
        kpi_score,
        previous_kpi,
        badges,
    })
}
