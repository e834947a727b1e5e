//! Cohort table assembly.
//!
//! Inner-joins the four weekly tables on `week`, drops the current
//! (partial) week by position, derives the per-user ratios, and re-bases
//! week numbers on the last retained row. Weeks missing from any table are
//! dropped silently. Both positional steps assume ascending week order,
//! so the joined rows are sorted before either runs.

use crate::models::{
    CohortRow, CohortTable, EngagementTables, Group, WeeklyAnalyticsRow, WeeklyDaysRow,
    WeeklyModulesRow, WeeklyReferralsRow,
};
use std::collections::HashMap;
use tracing::{debug, warn};

/// A week present in all four source tables.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedRow {
    pub week: i64,
    pub num_users: i64,
    pub avg_session_duration: String,
    pub avg_num_days: f64,
    pub num_modules: i64,
    pub num_refer: i64,
}

/// Inner join on `week`, ascending.
///
/// Duplicate weeks in a right-hand table keep their first occurrence.
pub fn join_weekly_tables(
    analytics: &[WeeklyAnalyticsRow],
    days: &[WeeklyDaysRow],
    modules: &[WeeklyModulesRow],
    referrals: &[WeeklyReferralsRow],
) -> Vec<JoinedRow> {
    let days = index_by_week(days, |r| r.week);
    let modules = index_by_week(modules, |r| r.week);
    let referrals = index_by_week(referrals, |r| r.week);

    let mut joined: Vec<JoinedRow> = analytics
        .iter()
        .filter_map(|row| {
            let day = days.get(&row.week)?;
            let module = modules.get(&row.week)?;
            let referral = referrals.get(&row.week)?;

            Some(JoinedRow {
                week: row.week,
                num_users: row.num_users,
                avg_session_duration: row.avg_session_duration.clone(),
                avg_num_days: day.avg_num_days,
                num_modules: module.num_modules,
                num_refer: referral.num_refer,
            })
        })
        .collect();

    joined.sort_by_key(|row| row.week);
    joined
}

fn index_by_week<T>(rows: &[T], week: impl Fn(&T) -> i64) -> HashMap<i64, &T> {
    let mut index = HashMap::with_capacity(rows.len());
    for row in rows {
        index.entry(week(row)).or_insert(row);
    }
    index
}

/// Turn joined rows into the final cohort rows.
///
/// Zero users yields NaN or infinite ratios; they are not guarded.
pub fn derive_cohort_rows(joined: Vec<JoinedRow>) -> Vec<CohortRow> {
    let retained: Vec<JoinedRow> = joined.into_iter().skip(1).collect();

    let Some(last_week) = retained.last().map(|row| row.week) else {
        return Vec::new();
    };

    retained
        .into_iter()
        .map(|row| {
            let users = row.num_users as f64;
            CohortRow {
                week: row.week - last_week,
                num_users: row.num_users,
                avg_session_duration: row.avg_session_duration,
                avg_num_days: row.avg_num_days,
                modules_per_user: row.num_modules as f64 / users,
                referrals_per_user: row.num_refer as f64 / users,
            }
        })
        .collect()
}

/// Assemble the cohort table of one group.
pub fn assemble_cohort(
    group: Group,
    analytics: &[WeeklyAnalyticsRow],
    engagement: &EngagementTables,
) -> CohortTable {
    let joined = join_weekly_tables(
        analytics,
        &engagement.days,
        &engagement.modules,
        &engagement.referrals,
    );
    debug!(
        "Group {}: {} analytics weeks, {} joined weeks",
        group,
        analytics.len(),
        joined.len()
    );

    let rows = derive_cohort_rows(joined);
    if rows.is_empty() {
        warn!("Group {}: no complete weeks after join", group);
    }

    CohortTable { group, rows }
}
