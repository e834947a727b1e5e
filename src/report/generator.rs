//! Local rendering of cohort tables.
//!
//! Used by dry runs and by `--output`: Markdown for reading, JSON and
//! CSV for other tools.

use crate::cli::OutputFormat;
use crate::models::{format_float, CohortTable};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::path::Path;

/// Render tables in the requested format.
pub fn render(
    tables: &[CohortTable],
    format: OutputFormat,
    generated_at: DateTime<Utc>,
) -> Result<String> {
    match format {
        OutputFormat::Markdown => Ok(generate_markdown_report(tables, generated_at)),
        OutputFormat::Json => generate_json_report(tables),
        OutputFormat::Csv => Ok(generate_csv_report(tables)),
    }
}

/// Generate one Markdown section per group.
pub fn generate_markdown_report(tables: &[CohortTable], generated_at: DateTime<Utc>) -> String {
    let mut output = String::new();

    output.push_str("# Cohort Analysis\n\n");
    output.push_str(&format!(
        "- **Generated:** {}\n\n",
        generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    for table in tables {
        output.push_str(&generate_table_section(table));
    }

    output
}

fn generate_table_section(table: &CohortTable) -> String {
    let mut section = String::new();

    section.push_str(&format!("## Group: {}\n\n", table.group));

    if table.is_empty() {
        section.push_str("No complete weeks in the lookback window.\n\n");
        return section;
    }

    section.push_str(&format!("| {} |\n", CohortTable::HEADER.join(" | ")));
    section.push_str("|---:|---:|:---|---:|---:|---:|\n");

    for row in &table.rows {
        section.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} |\n",
            row.week,
            row.num_users,
            row.avg_session_duration,
            format_ratio(row.avg_num_days),
            format_ratio(row.modules_per_user),
            format_ratio(row.referrals_per_user),
        ));
    }
    section.push('\n');

    section
}

/// Two decimals for finite values; NaN/inf as written to the sheet.
fn format_ratio(value: f64) -> String {
    if value.is_finite() {
        format!("{:.2}", value)
    } else {
        format_float(value)
    }
}

/// Generate a JSON array of tables.
///
/// JSON has no NaN or infinity, so non-finite ratios serialize as `null`.
pub fn generate_json_report(tables: &[CohortTable]) -> Result<String> {
    serde_json::to_string_pretty(tables).context("Failed to serialize cohort tables to JSON")
}

/// Generate CSV: a `group` column followed by the sheet columns.
pub fn generate_csv_report(tables: &[CohortTable]) -> String {
    let mut output = String::new();

    output.push_str("group,");
    output.push_str(&CohortTable::HEADER.join(","));
    output.push('\n');

    for table in tables {
        for row in table.to_grid().iter().skip(1) {
            let cells: Vec<String> = row.iter().map(|c| csv_escape(c)).collect();
            output.push_str(&format!("{},{}\n", table.group, cells.join(",")));
        }
    }

    output
}

fn csv_escape(cell: &str) -> String {
    if cell.contains([',', '"', '\n']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

/// Write rendered output to a file.
pub fn write_report(content: &str, path: &Path) -> Result<()> {
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write report to {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CohortRow, Group};

    fn create_test_tables() -> Vec<CohortTable> {
        vec![
            CohortTable {
                group: Group::All,
                rows: vec![
                    CohortRow {
                        week: -1,
                        num_users: 120,
                        avg_session_duration: "3 minutes 10 seconds".to_string(),
                        avg_num_days: 1.75,
                        modules_per_user: 2.5,
                        referrals_per_user: 0.1,
                    },
                    CohortRow {
                        week: 0,
                        num_users: 0,
                        avg_session_duration: "0 minutes 0 seconds".to_string(),
                        avg_num_days: 1.0,
                        modules_per_user: f64::INFINITY,
                        referrals_per_user: f64::NAN,
                    },
                ],
            },
            CohortTable {
                group: Group::GroupA,
                rows: vec![],
            },
        ]
    }

    #[test]
    fn test_generate_markdown_report() {
        let markdown = generate_markdown_report(&create_test_tables(), Utc::now());

        assert!(markdown.contains("# Cohort Analysis"));
        assert!(markdown.contains("## Group: all"));
        assert!(markdown.contains("| week | num_users | avg_session_duration |"));
        assert!(markdown.contains("| -1 | 120 | 3 minutes 10 seconds | 1.75 | 2.50 | 0.10 |"));
        assert!(markdown.contains("| inf | NaN |"));
        assert!(markdown.contains("## Group: group-a"));
        assert!(markdown.contains("No complete weeks"));
    }

    #[test]
    fn test_generate_csv_report() {
        let csv = generate_csv_report(&create_test_tables());
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(
            lines[0],
            "group,week,num_users,avg_session_duration,avg_num_days,modules_per_user,referrals_per_user"
        );
        assert_eq!(lines[1], "all,-1,120,3 minutes 10 seconds,1.75,2.5,0.1");
        assert_eq!(lines[2], "all,0,0,0 minutes 0 seconds,1,inf,NaN");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_csv_escape() {
        assert_eq!(csv_escape("plain"), "plain");
        assert_eq!(csv_escape("a,b"), "\"a,b\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_generate_json_report() {
        let json = generate_json_report(&create_test_tables()).unwrap();

        assert!(json.contains("\"group\": \"all\""));
        assert!(json.contains("\"group\": \"group-a\""));
        assert!(json.contains("\"modules_per_user\": null"));
        assert!(json.contains("\"avg_session_duration\""));
    }

    #[test]
    fn test_write_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cohorts.md");

        write_report("# Cohort Analysis\n", &path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# Cohort Analysis\n");
    }
}
