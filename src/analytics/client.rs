//! Analytics Reporting API client.

use crate::analytics::request::{weekly_report_request, BatchGetRequest, BatchGetResponse};
use crate::analytics::table::build_weekly_table;
use crate::auth::AccessToken;
use crate::cohort::AnalyticsSource;
use crate::config::AnalyticsConfig;
use crate::error::{CohortError, Result};
use crate::models::{Group, WeeklyAnalyticsRow};
use tracing::{debug, info};

/// Issues batch report requests for one reporting view.
pub struct AnalyticsClient {
    config: AnalyticsConfig,
    http_client: reqwest::Client,
    token: AccessToken,
}

impl AnalyticsClient {
    pub fn new(config: AnalyticsConfig, http_client: reqwest::Client, token: AccessToken) -> Self {
        Self {
            config,
            http_client,
            token,
        }
    }

    /// Request for a group: the segment filter is the only thing that varies.
    pub fn request_for(&self, group: Group) -> BatchGetRequest {
        weekly_report_request(
            &self.config.view_id,
            self.config.lookback_days,
            self.config.segment_for(group),
        )
    }

    /// Fetch the raw weekly report for a group. Single request, no paging.
    pub async fn fetch_report(&self, group: Group) -> Result<BatchGetResponse> {
        let url = format!(
            "{}/v4/reports:batchGet",
            self.config.api_url.trim_end_matches('/')
        );
        let request = self.request_for(group);
        debug!("POST {} for group {}", url, group);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(self.token.as_str())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CohortError::Api {
                service: "Analytics Reporting",
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json().await?)
    }
}

impl AnalyticsSource for AnalyticsClient {
    async fn weekly_analytics(&self, group: Group) -> Result<Vec<WeeklyAnalyticsRow>> {
        let response = self.fetch_report(group).await?;
        let table = build_weekly_table(&response, group)?;
        info!("Analytics: {} weeks for group {}", table.len(), group);
        Ok(table)
    }
}
