//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::Group;
use clap::Parser;
use std::path::PathBuf;

/// Cohortsheet - weekly cohort analysis published to a spreadsheet
///
/// Pulls weekly users and session duration from the analytics service,
/// joins them with engagement counts from the database, and writes one
/// cohort table per user group to the shared spreadsheet.
///
/// Examples:
///   cohortsheet
///   cohortsheet --group all --dry-run
///   cohortsheet --dry-run --format csv --output cohorts.csv
///   cohortsheet --init-config
#[derive(Parser, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to configuration file
    ///
    /// If not specified, looks for .cohortsheet.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Groups to compute (repeatable). Defaults to all three.
    #[arg(short, long, value_name = "GROUP")]
    pub group: Vec<Group>,

    /// Database user
    #[arg(long, env = "SQL_USER", hide_env_values = true)]
    pub db_user: Option<String>,

    /// Database password
    #[arg(long, env = "SQL_PWD", hide_env_values = true)]
    pub db_password: Option<String>,

    /// Database host
    #[arg(long, env = "SQL_HOST")]
    pub db_host: Option<String>,

    /// Database name
    #[arg(long, env = "SQL_DB")]
    pub db_name: Option<String>,

    /// Analytics reporting view id
    #[arg(long, env = "GA_VIEWID")]
    pub view_id: Option<String>,

    /// Service-account JSON key file
    #[arg(long, value_name = "FILE", env = "GOOGLE_APPLICATION_CREDENTIALS")]
    pub key_file: Option<PathBuf>,

    /// Spreadsheet id (skips the lookup by title)
    #[arg(long, value_name = "ID")]
    pub spreadsheet_id: Option<String>,

    /// Compute the tables and print them without publishing
    #[arg(long)]
    pub dry_run: bool,

    /// Format for printed or locally written tables
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Also write the rendered tables to this file
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .cohortsheet.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

// Hand-written so the database password never reaches the logs.
impl std::fmt::Debug for Args {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Args")
            .field("config", &self.config)
            .field("group", &self.group)
            .field("db_user", &self.db_user)
            .field("db_password", &self.db_password.as_ref().map(|_| "***"))
            .field("db_host", &self.db_host)
            .field("db_name", &self.db_name)
            .field("view_id", &self.view_id)
            .field("key_file", &self.key_file)
            .field("spreadsheet_id", &self.spreadsheet_id)
            .field("dry_run", &self.dry_run)
            .field("format", &self.format)
            .field("output", &self.output)
            .field("verbose", &self.verbose)
            .field("quiet", &self.quiet)
            .field("init_config", &self.init_config)
            .finish()
    }
}

/// Output format for locally rendered tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown tables (default)
    #[default]
    Markdown,
    /// JSON array of tables
    Json,
    /// CSV, one block per group
    Csv,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref key_file) = self.key_file {
            if !key_file.is_file() {
                return Err(format!(
                    "Credential file does not exist: {}",
                    key_file.display()
                ));
            }
        }

        if let Some(ref id) = self.spreadsheet_id {
            if id.trim().is_empty() {
                return Err("Spreadsheet id must not be empty".to_string());
            }
        }

        Ok(())
    }

    /// Groups to run, deduplicated, in publishing order.
    pub fn groups(&self) -> Vec<Group> {
        if self.group.is_empty() {
            return Group::PUBLISH_ORDER.to_vec();
        }

        Group::PUBLISH_ORDER
            .into_iter()
            .filter(|g| self.group.contains(g))
            .collect()
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            config: None,
            group: vec![],
            db_user: None,
            db_password: None,
            db_host: None,
            db_name: None,
            view_id: None,
            key_file: None,
            spreadsheet_id: None,
            dry_run: false,
            format: OutputFormat::Markdown,
            output: None,
            verbose: false,
            quiet: false,
            init_config: false,
        }
    }

    #[test]
    fn test_default_groups() {
        let args = make_args();
        assert_eq!(
            args.groups(),
            vec![Group::All, Group::GroupB, Group::GroupA]
        );
    }

    #[test]
    fn test_selected_groups_keep_publish_order() {
        let mut args = make_args();
        args.group = vec![Group::GroupA, Group::All, Group::GroupA];
        assert_eq!(args.groups(), vec![Group::All, Group::GroupA]);
    }

    #[test]
    fn test_parse_from_command_line() {
        let args = Args::try_parse_from([
            "cohortsheet",
            "--group",
            "group-b",
            "--dry-run",
            "--format",
            "csv",
            "--db-host",
            "db.internal",
        ])
        .unwrap();

        assert_eq!(args.group, vec![Group::GroupB]);
        assert!(args.dry_run);
        assert_eq!(args.format, OutputFormat::Csv);
        assert_eq!(args.db_host.as_deref(), Some("db.internal"));
    }

    #[test]
    fn test_debug_redacts_db_password() {
        let args = Args::try_parse_from([
            "cohortsheet",
            "--db-password",
            "hunter2-secret",
            "--db-user",
            "reporter",
            "--verbose",
        ])
        .unwrap();

        let line = format!("Arguments: {:?}", args);
        assert!(!line.contains("hunter2-secret"));
        assert!(line.contains("db_password: Some(\"***\")"));
        assert!(line.contains("reporter"));
        assert_eq!(args.db_password.as_deref(), Some("hunter2-secret"));
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_missing_key_file() {
        let mut args = make_args();
        args.key_file = Some(PathBuf::from("/nonexistent/key.json"));
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_empty_spreadsheet_id() {
        let mut args = make_args();
        args.spreadsheet_id = Some("  ".to_string());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
