//! Data models for the cohort pipeline.
//!
//! This module contains the per-week tables produced by each stage,
//! the group selector, and the final cohort table.

use serde::{Deserialize, Serialize};
use std::fmt;

/// User population a cohort table is computed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Group {
    /// Every user
    All,
    /// Users outside the configured institution
    GroupA,
    /// Users belonging to the configured institution
    GroupB,
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Group::All => write!(f, "all"),
            Group::GroupA => write!(f, "group-a"),
            Group::GroupB => write!(f, "group-b"),
        }
    }
}

impl Group {
    /// Publishing order: matches the tab layout of the shared sheet.
    pub const PUBLISH_ORDER: [Group; 3] = [Group::All, Group::GroupB, Group::GroupA];

    /// Whether the group narrows the population (segment + institution filter).
    pub fn is_segmented(&self) -> bool {
        !matches!(self, Group::All)
    }
}

/// One week of analytics data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyAnalyticsRow {
    pub week: i64,
    pub num_users: i64,
    /// Formatted as "M minutes S seconds".
    pub avg_session_duration: String,
}

/// Average number of active days per user for one week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct WeeklyDaysRow {
    pub week: i64,
    pub avg_num_days: f64,
}

/// Completed modules for one week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct WeeklyModulesRow {
    pub week: i64,
    pub num_modules: i64,
}

/// Executed referrals for one week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct WeeklyReferralsRow {
    pub week: i64,
    pub num_refer: i64,
}

/// The three engagement tables of one group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngagementTables {
    pub days: Vec<WeeklyDaysRow>,
    pub modules: Vec<WeeklyModulesRow>,
    pub referrals: Vec<WeeklyReferralsRow>,
}

/// One row of the final cohort table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortRow {
    /// Offset from the most recent retained week (0 = most recent).
    pub week: i64,
    pub num_users: i64,
    pub avg_session_duration: String,
    pub avg_num_days: f64,
    pub modules_per_user: f64,
    pub referrals_per_user: f64,
}

/// Cohort rows for one group, ordered by ascending week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortTable {
    pub group: Group,
    pub rows: Vec<CohortRow>,
}

impl CohortTable {
    /// Column header written above the rows.
    pub const HEADER: [&'static str; 6] = [
        "week",
        "num_users",
        "avg_session_duration",
        "avg_num_days",
        "modules_per_user",
        "referrals_per_user",
    ];

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Header plus rows as a rectangular grid of cell strings.
    pub fn to_grid(&self) -> Vec<Vec<String>> {
        let mut grid = Vec::with_capacity(self.rows.len() + 1);
        grid.push(Self::HEADER.iter().map(|h| h.to_string()).collect());

        for row in &self.rows {
            grid.push(vec![
                row.week.to_string(),
                row.num_users.to_string(),
                row.avg_session_duration.clone(),
                format_float(row.avg_num_days),
                format_float(row.modules_per_user),
                format_float(row.referrals_per_user),
            ]);
        }

        grid
    }
}

/// Render a float for a cell. Non-finite values become `NaN`, `inf`, `-inf`.
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-inf".to_string()
    } else {
        value.to_string()
    }
}
