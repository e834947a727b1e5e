//! Flattening of the analytics response into a per-week table.

use crate::analytics::request::{BatchGetResponse, Report};
use crate::error::{CohortError, Result};
use crate::models::{Group, WeeklyAnalyticsRow};
use tracing::debug;

/// Format a duration in seconds as `"M minutes S seconds"`.
///
/// Both parts are floored, so fractional seconds are dropped.
pub fn format_duration(seconds: f64) -> String {
    let minutes = (seconds / 60.0).floor() as i64;
    let rest = seconds.rem_euclid(60.0).floor() as i64;
    format!("{} minutes {} seconds", minutes, rest)
}

/// Build the weekly analytics table from a batch response.
///
/// Rows carry `[week]` for the unsegmented population and
/// `[segment, week]` for segmented groups; the segment value is dropped.
/// Each row must hold exactly two metric values, users then duration.
/// The result is sorted by ascending week.
pub fn build_weekly_table(
    response: &BatchGetResponse,
    group: Group,
) -> Result<Vec<WeeklyAnalyticsRow>> {
    let expected_dims = if group.is_segmented() { 2 } else { 1 };
    let mut table = Vec::new();

    for report in &response.reports {
        check_column_header(report, expected_dims)?;

        for (index, row) in report.data.rows.iter().enumerate() {
            if row.dimensions.len() != expected_dims {
                return Err(CohortError::MalformedReport(format!(
                    "row {} has {} dimensions, expected {} for group {}",
                    index,
                    row.dimensions.len(),
                    expected_dims,
                    group
                )));
            }

            let week_value = &row.dimensions[expected_dims - 1];
            let week: i64 = week_value.trim().parse().map_err(|_| {
                CohortError::MalformedReport(format!(
                    "row {} has non-numeric week '{}'",
                    index, week_value
                ))
            })?;

            let values: Vec<&String> = row.metrics.iter().flat_map(|m| &m.values).collect();
            let [users, duration] = values.as_slice() else {
                return Err(CohortError::MalformedReport(format!(
                    "row {} has {} metric values, expected 2",
                    index,
                    values.len()
                )));
            };

            let users = parse_metric(users, index)?;
            let duration = parse_metric(duration, index)?;

            table.push(WeeklyAnalyticsRow {
                week,
                num_users: users as i64,
                avg_session_duration: format_duration(duration),
            });
        }
    }

    table.sort_by_key(|row| row.week);
    debug!("Built analytics table for {} with {} weeks", group, table.len());

    Ok(table)
}

/// Headers are optional in the response; when present they must match the request.
fn check_column_header(report: &Report, expected_dims: usize) -> Result<()> {
    let header = &report.column_header;

    if !header.dimensions.is_empty() && header.dimensions.len() != expected_dims {
        return Err(CohortError::MalformedReport(format!(
            "report has dimensions {:?}, expected {}",
            header.dimensions, expected_dims
        )));
    }

    let metrics = header.metric_header.metric_header_entries.len();
    if metrics != 0 && metrics != 2 {
        return Err(CohortError::MalformedReport(format!(
            "report has {} metric columns, expected 2",
            metrics
        )));
    }

    Ok(())
}

fn parse_metric(value: &str, index: usize) -> Result<f64> {
    value.trim().parse::<f64>().map_err(|_| {
        CohortError::MalformedReport(format!(
            "row {} has non-numeric metric '{}'",
            index, value
        ))
    })
}
