//! Data sources the cohort pipeline pulls from.

use crate::error::Result;
use crate::models::{EngagementTables, Group, WeeklyAnalyticsRow};
use std::future::Future;

/// Provides the weekly users/session-duration table for a group.
pub trait AnalyticsSource: Send + Sync {
    /// Weekly analytics rows, ascending by week.
    fn weekly_analytics(
        &self,
        group: Group,
    ) -> impl Future<Output = Result<Vec<WeeklyAnalyticsRow>>> + Send;
}

/// Provides the three weekly engagement tables for a group.
pub trait EngagementSource: Send + Sync {
    fn weekly_engagement(
        &self,
        group: Group,
    ) -> impl Future<Output = Result<EngagementTables>> + Send;
}
