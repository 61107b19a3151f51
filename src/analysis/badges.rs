//! Contributor badge assignment.

use crate::models::{Badge, BadgeMap, ContributorMap, ContributorStats};

/// Active days needed for [`Badge::ConsistentContributor`].
pub const CONSISTENT_MIN_DAYS: usize = 3;

/// Contributor with the highest `metric`.
///
/// Ties go to whoever was seen first in the run.
fn leader<'a, T, F>(contributors: &'a ContributorMap, metric: F) -> Option<(&'a str, T)>
where
    T: PartialOrd + Copy,
    F: Fn(&ContributorStats) -> T,
{
    let mut best: Option<(&str, T)> = None;

    for (name, stats) in contributors {
        let value = metric(stats);
        let replace = match best {
            Some((_, top)) => value > top,
            None => true,
        };
        if replace {
            best = Some((name.as_str(), value));
        }
    }

    best
}

fn award(badges: &mut BadgeMap, contributor: &str, badge: Badge) {
    badges
        .entry(contributor.to_string())
        .or_default()
        .push(badge);
}

/// Assign badges for the run.
///
/// Superlatives are evaluated in a fixed order (top KPI, bug fixes,
/// total actions, additions, refactors), then every contributor with
/// enough active days is marked consistent. Each contributor's list
/// keeps that order.
pub fn assign_badges(contributors: &ContributorMap) -> BadgeMap {
    let mut badges = BadgeMap::new();

    if contributors.is_empty() {
        return badges;
    }

    if let Some((name, _)) = leader(contributors, |c| c.kpi) {
        award(&mut badges, name, Badge::TopContributor);
    }

    if let Some((name, fixes)) = leader(contributors, |c| c.bug_fixes) {
        if fixes > 0 {
            award(&mut badges, name, Badge::BugSquasher);
        }
    }

    if let Some((name, _)) = leader(contributors, |c| c.total_actions) {
        award(&mut badges, name, Badge::MostActive);
    }

    if let Some((name, adds)) = leader(contributors, |c| c.add_commits) {
        if adds > 0 {
            award(&mut badges, name, Badge::FeatureCreator);
        }
    }

    if let Some((name, refactors)) = leader(contributors, |c| c.refactor_commits) {
        if refactors > 0 {
            award(&mut badges, name, Badge::CodeRefactorer);
        }
    }

    for (name, stats) in contributors {
        if stats.active_days.len() >= CONSISTENT_MIN_DAYS {
            award(&mut badges, name, Badge::ConsistentContributor);
        }
    }

    badges
}
