//! Cohortsheet - weekly cohort analysis
//!
//! A scheduled job that joins weekly analytics metrics with engagement
//! aggregates from the database and publishes one cohort table per
//! user group to a shared spreadsheet.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Any failure (configuration, authentication, query, publish)

mod analytics;
mod auth;
mod cli;
mod cohort;
mod config;
mod engagement;
mod error;
mod models;
mod report;
mod sheets;

use analytics::AnalyticsClient;
use anyhow::{Context, Result};
use auth::{ServiceAccountAuth, ServiceAccountKey};
use chrono::Utc;
use cli::Args;
use cohort::CohortPipeline;
use config::{Config, DEFAULT_CONFIG_FILE};
use engagement::EngagementRunner;
use indicatif::{ProgressBar, ProgressStyle};
use models::CohortTable;
use sheets::SheetsClient;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    info!("Cohortsheet v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run(args).await {
        error!("Cohort analysis failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .cohortsheet.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", DEFAULT_CONFIG_FILE);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Fill in the database and analytics settings before the first run.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Compute every selected group, then render and/or publish.
async fn run(args: Args) -> Result<()> {
    let start_time = Instant::now();

    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    config.validate()?;

    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.general.timeout_seconds))
        .build()
        .context("Failed to create HTTP client")?;

    // Step 1: Authenticate the service account
    println!(
        "🔑 Authenticating with {}",
        config.credentials.key_file.display()
    );
    let key = ServiceAccountKey::from_file(&config.credentials.key_file)?;
    let auth = ServiceAccountAuth::new(key, http_client.clone());
    let scopes = required_scopes(&args, &config);
    let token = auth
        .access_token(&scopes)
        .await
        .with_context(|| format!("Failed to authenticate as {}", auth.client_email()))?;

    // Step 2: Run the pipeline for each group
    let pipeline = CohortPipeline::new(
        AnalyticsClient::new(config.analytics.clone(), http_client.clone(), token.clone()),
        EngagementRunner::new(config.database.clone(), config.analytics.lookback_days),
    );

    let mut tables: Vec<CohortTable> = Vec::new();
    for group in args.groups() {
        let spinner = group_spinner(&args, &group.to_string());
        let table = pipeline
            .run(group)
            .await
            .with_context(|| format!("Cohort analysis failed for group {}", group));
        spinner.finish_and_clear();

        let table = table?;
        if table.is_empty() {
            warn!("Group {} produced no cohort weeks", group);
        }
        println!("📊 Group {}: {} weeks", group, table.rows.len());
        tables.push(table);
    }

    // Step 3: Local output
    if args.dry_run || args.output.is_some() {
        let rendered = report::render(&tables, args.format, Utc::now())?;

        if args.dry_run {
            println!("\n{}", rendered);
        }
        if let Some(ref path) = args.output {
            report::write_report(&rendered, path)?;
            println!("💾 Tables written to {}", path.display());
        }
    }

    // Step 4: Publish
    if args.dry_run {
        println!("\n✅ Dry run complete. Nothing was published.");
        return Ok(());
    }

    println!("\n📤 Publishing {} tables...", tables.len());
    let sheets = SheetsClient::new(config.sheets.clone(), http_client, token);
    let spreadsheet_id = sheets
        .publish(&tables)
        .await
        .context("Failed to publish cohort tables")?;

    println!(
        "\n✅ Cohort analysis complete in {:.1}s. Spreadsheet: {}",
        start_time.elapsed().as_secs_f64(),
        spreadsheet_id
    );

    Ok(())
}

/// OAuth scopes for this run: publishing needs sheet access, title lookup needs Drive.
fn required_scopes(args: &Args, config: &Config) -> Vec<&'static str> {
    let mut scopes = vec![auth::ANALYTICS_READONLY_SCOPE];

    if !args.dry_run {
        scopes.push(auth::SPREADSHEETS_SCOPE);

        let has_id = config
            .sheets
            .spreadsheet_id
            .as_deref()
            .is_some_and(|id| !id.is_empty());
        if !has_id {
            scopes.push(auth::DRIVE_READONLY_SCOPE);
        }
    }

    scopes
}

fn group_spinner(args: &Args, group: &str) -> ProgressBar {
    if args.quiet {
        return ProgressBar::hidden();
    }

    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg} [{elapsed}]") {
        spinner.set_style(style);
    }
    spinner.set_message(format!("Computing cohorts for group {}", group));
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location; a file that exists but fails to parse is fatal
    match Config::load_default()? {
        Some(config) => {
            info!("Loaded default config from {}", DEFAULT_CONFIG_FILE);
            Ok(config)
        }
        None => {
            debug!("No config file found, using defaults and environment");
            Ok(Config::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["cohortsheet"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_dry_run_needs_analytics_only() {
        let scopes = required_scopes(&args(&["--dry-run"]), &Config::default());
        assert_eq!(scopes, vec![auth::ANALYTICS_READONLY_SCOPE]);
    }

    #[test]
    fn test_publish_without_id_needs_drive() {
        let scopes = required_scopes(&args(&[]), &Config::default());
        assert!(scopes.contains(&auth::SPREADSHEETS_SCOPE));
        assert!(scopes.contains(&auth::DRIVE_READONLY_SCOPE));
    }

    #[test]
    fn test_publish_with_id_skips_drive() {
        let mut config = Config::default();
        config.sheets.spreadsheet_id = Some("1AbC".to_string());

        let scopes = required_scopes(&args(&[]), &config);
        assert!(scopes.contains(&auth::SPREADSHEETS_SCOPE));
        assert!(!scopes.contains(&auth::DRIVE_READONLY_SCOPE));
    }
}
