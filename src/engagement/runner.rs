//! Executes the engagement aggregates against MySQL.

use crate::cohort::EngagementSource;
use crate::config::DatabaseConfig;
use crate::engagement::queries::{days_query, modules_query, referrals_query, InstitutionFilter};
use crate::error::Result;
use crate::models::{
    EngagementTables, Group, WeeklyDaysRow, WeeklyModulesRow, WeeklyReferralsRow,
};
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::{Connection, FromRow};
use tracing::{debug, info};

/// Runs the three weekly aggregates for a group.
pub struct EngagementRunner {
    config: DatabaseConfig,
    lookback_days: u32,
}

impl EngagementRunner {
    pub fn new(config: DatabaseConfig, lookback_days: u32) -> Self {
        Self {
            config,
            lookback_days,
        }
    }

    pub fn connect_options(&self) -> MySqlConnectOptions {
        MySqlConnectOptions::new()
            .host(&self.config.host)
            .port(self.config.port)
            .username(&self.config.user)
            .password(&self.config.password)
            .database(&self.config.name)
    }

    /// Run one query on its own connection, closed once rows are fetched.
    async fn fetch<T>(&self, label: &str, sql: &str) -> Result<Vec<T>>
    where
        T: for<'r> FromRow<'r, MySqlRow> + Send + Unpin,
    {
        debug!("Running {} query:\n{}", label, sql);

        let mut conn = MySqlConnection::connect_with(&self.connect_options()).await?;
        let rows = sqlx::query_as::<_, T>(sql).fetch_all(&mut conn).await?;
        conn.close().await?;

        debug!("{} query returned {} rows", label, rows.len());
        Ok(rows)
    }
}

impl EngagementSource for EngagementRunner {
    async fn weekly_engagement(&self, group: Group) -> Result<EngagementTables> {
        let filter = InstitutionFilter::for_group(group, self.config.institution_id);
        let days_sql = days_query(filter, self.lookback_days);
        let modules_sql = modules_query(filter, self.lookback_days);
        let referrals_sql = referrals_query(filter, self.lookback_days);

        let (days, modules, referrals) = tokio::try_join!(
            self.fetch::<WeeklyDaysRow>("days", &days_sql),
            self.fetch::<WeeklyModulesRow>("modules", &modules_sql),
            self.fetch::<WeeklyReferralsRow>("referrals", &referrals_sql),
        )?;

        info!(
            "Engagement for group {}: {} day rows, {} module rows, {} referral rows",
            group,
            days.len(),
            modules.len(),
            referrals.len()
        );

        Ok(EngagementTables {
            days,
            modules,
            referrals,
        })
    }
}
