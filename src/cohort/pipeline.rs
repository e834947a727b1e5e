//! One cohort run: fetch, query, assemble.

use crate::cohort::assembler::assemble_cohort;
use crate::cohort::traits::{AnalyticsSource, EngagementSource};
use crate::error::Result;
use crate::models::{CohortTable, Group};
use tracing::info;

/// Runs the cohort pipeline for any group against a pair of sources.
pub struct CohortPipeline<A, E> {
    analytics: A,
    engagement: E,
}

impl<A, E> CohortPipeline<A, E>
where
    A: AnalyticsSource,
    E: EngagementSource,
{
    pub fn new(analytics: A, engagement: E) -> Self {
        Self {
            analytics,
            engagement,
        }
    }

    /// Build the cohort table for a group. Any source failure aborts the run.
    pub async fn run(&self, group: Group) -> Result<CohortTable> {
        info!("Running cohort analysis for group {}", group);

        let analytics = self.analytics.weekly_analytics(group).await?;
        let engagement = self.engagement.weekly_engagement(group).await?;

        let table = assemble_cohort(group, &analytics, &engagement);
        info!("Group {}: {} cohort weeks", group, table.rows.len());

        Ok(table)
    }
}
