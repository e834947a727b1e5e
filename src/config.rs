//! Configuration file handling.
//!
//! This module handles loading `.cohortsheet.toml` and merging it with
//! command-line arguments and environment variables.

use crate::error::CohortError;
use crate::models::Group;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".cohortsheet.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Relational store settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Analytics reporting settings.
    #[serde(default)]
    pub analytics: AnalyticsConfig,

    /// Spreadsheet publishing settings.
    #[serde(default)]
    pub sheets: SheetsConfig,

    /// Service-account credential settings.
    #[serde(default)]
    pub credentials: CredentialsConfig,
}

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// HTTP request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    60
}

/// MySQL connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub user: String,

    #[serde(default)]
    pub password: String,

    #[serde(default = "default_db_host")]
    pub host: String,

    #[serde(default = "default_db_port")]
    pub port: u16,

    /// Database (schema) name.
    #[serde(default)]
    pub name: String,

    /// Institution that separates group-b (members) from group-a (everyone else).
    #[serde(default = "default_institution_id")]
    pub institution_id: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            user: String::new(),
            password: String::new(),
            host: default_db_host(),
            port: default_db_port(),
            name: String::new(),
            institution_id: default_institution_id(),
        }
    }
}

fn default_db_host() -> String {
    "localhost".to_string()
}

fn default_db_port() -> u16 {
    3306
}

fn default_institution_id() -> u32 {
    90
}

/// Analytics Reporting API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// Reporting view to query.
    #[serde(default)]
    pub view_id: String,

    #[serde(default = "default_analytics_url")]
    pub api_url: String,

    /// Size of the report window, ending today.
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,

    /// Segment id used for group-a.
    #[serde(default = "default_group_a_segment")]
    pub group_a_segment: String,

    /// Segment id used for group-b.
    #[serde(default = "default_group_b_segment")]
    pub group_b_segment: String,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            view_id: String::new(),
            api_url: default_analytics_url(),
            lookback_days: default_lookback_days(),
            group_a_segment: default_group_a_segment(),
            group_b_segment: default_group_b_segment(),
        }
    }
}

fn default_analytics_url() -> String {
    "https://analyticsreporting.googleapis.com".to_string()
}

fn default_lookback_days() -> u32 {
    49 // seven full weeks
}

fn default_group_a_segment() -> String {
    "gaid::xYwcqslQTFOYNgonvtoKzA".to_string()
}

fn default_group_b_segment() -> String {
    "gaid::llm7xc8IQv2Flkit2ofZFA".to_string()
}

impl AnalyticsConfig {
    /// Segment filter for a group, `None` for the unsegmented population.
    pub fn segment_for(&self, group: Group) -> Option<&str> {
        match group {
            Group::All => None,
            Group::GroupA => Some(&self.group_a_segment),
            Group::GroupB => Some(&self.group_b_segment),
        }
    }
}

/// Spreadsheet publishing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetsConfig {
    /// Spreadsheet id. When empty the spreadsheet is looked up by title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spreadsheet_id: Option<String>,

    #[serde(default = "default_spreadsheet_title")]
    pub spreadsheet_title: String,

    #[serde(default = "default_sheets_url")]
    pub api_url: String,

    #[serde(default = "default_drive_url")]
    pub drive_api_url: String,

    /// Top-left cell of the written table.
    #[serde(default = "default_anchor")]
    pub anchor: String,

    #[serde(default = "default_all_tab")]
    pub all_tab: usize,

    #[serde(default = "default_group_b_tab")]
    pub group_b_tab: usize,

    #[serde(default = "default_group_a_tab")]
    pub group_a_tab: usize,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            spreadsheet_id: None,
            spreadsheet_title: default_spreadsheet_title(),
            api_url: default_sheets_url(),
            drive_api_url: default_drive_url(),
            anchor: default_anchor(),
            all_tab: default_all_tab(),
            group_b_tab: default_group_b_tab(),
            group_a_tab: default_group_a_tab(),
        }
    }
}

fn default_spreadsheet_title() -> String {
    "Cohort Analysis".to_string()
}

fn default_sheets_url() -> String {
    "https://sheets.googleapis.com".to_string()
}

fn default_drive_url() -> String {
    "https://www.googleapis.com".to_string()
}

fn default_anchor() -> String {
    "A1".to_string()
}

fn default_all_tab() -> usize {
    0
}

fn default_group_b_tab() -> usize {
    1
}

fn default_group_a_tab() -> usize {
    2
}

impl SheetsConfig {
    /// Tab index a group's table is written to.
    pub fn tab_for(&self, group: Group) -> usize {
        match group {
            Group::All => self.all_tab,
            Group::GroupA => self.group_a_tab,
            Group::GroupB => self.group_b_tab,
        }
    }
}

/// Service-account credential settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsConfig {
    /// Path to the service-account JSON key.
    #[serde(default = "default_key_file")]
    pub key_file: PathBuf,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            key_file: default_key_file(),
        }
    }
}

fn default_key_file() -> PathBuf {
    PathBuf::from("client_secrets.json")
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments (and the environment variables clap reads for them)
    /// take precedence over config file settings. Only values that were
    /// actually provided override the file.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref user) = args.db_user {
            self.database.user = user.clone();
        }
        if let Some(ref password) = args.db_password {
            self.database.password = password.clone();
        }
        if let Some(ref host) = args.db_host {
            self.database.host = host.clone();
        }
        if let Some(ref name) = args.db_name {
            self.database.name = name.clone();
        }
        if let Some(ref view_id) = args.view_id {
            self.analytics.view_id = view_id.clone();
        }
        if let Some(ref key_file) = args.key_file {
            self.credentials.key_file = key_file.clone();
        }
        if let Some(ref spreadsheet_id) = args.spreadsheet_id {
            self.sheets.spreadsheet_id = Some(spreadsheet_id.clone());
        }
    }

    /// Check that everything a run needs is present.
    pub fn validate(&self) -> std::result::Result<(), CohortError> {
        if self.database.user.is_empty() {
            return Err(CohortError::Config("database user is not set".to_string()));
        }
        if self.database.host.is_empty() {
            return Err(CohortError::Config("database host is not set".to_string()));
        }
        if self.database.name.is_empty() {
            return Err(CohortError::Config("database name is not set".to_string()));
        }
        if self.analytics.view_id.is_empty() {
            return Err(CohortError::Config("analytics view id is not set".to_string()));
        }
        if self.general.timeout_seconds == 0 {
            return Err(CohortError::Config(
                "timeout_seconds must be at least 1".to_string(),
            ));
        }
        if self.analytics.lookback_days == 0 {
            return Err(CohortError::Config(
                "lookback_days must be at least 1".to_string(),
            ));
        }
        if !is_valid_anchor(&self.sheets.anchor) {
            return Err(CohortError::Config(format!(
                "invalid anchor cell: {}",
                self.sheets.anchor
            )));
        }

        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

/// A1-style cell reference: column letters followed by a row number >= 1.
fn is_valid_anchor(anchor: &str) -> bool {
    let letters = anchor
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .count();
    let digits = &anchor[letters..];

    letters > 0
        && !digits.is_empty()
        && digits.chars().all(|c| c.is_ascii_digit())
        && !digits.starts_with('0')
}
