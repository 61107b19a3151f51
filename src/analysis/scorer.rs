//! Global KPI score.

use crate::models::GlobalStats;

/// Weighted KPI over repository-wide counters.
///
/// Refactors and uncategorised commits score nothing here. This is not
/// the sum of contributor KPIs; the two use different weights.
pub fn kpi_score(stats: &GlobalStats) -> f64 {
    2.0 * f64::from(stats.commits_added)
        + 2.5 * f64::from(stats.commits_fixed)
        + 2.0 * f64::from(stats.issues_closed)
        + 3.0 * f64::from(stats.tasks_completed)
}
