//! Analytics Reporting API v4 request and response shapes.
//!
//! One parameterized builder produces the request for every group; the
//! segmented groups only add a segment dimension and a segment filter.

use serde::{Deserialize, Serialize};

pub const USERS_METRIC: &str = "ga:users";
pub const AVG_SESSION_DURATION_METRIC: &str = "ga:avgSessionDuration";
pub const WEEK_DIMENSION: &str = "ga:week";
pub const SEGMENT_DIMENSION: &str = "ga:segment";

/// Body of a `reports:batchGet` call.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BatchGetRequest {
    pub report_requests: Vec<ReportRequest>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    pub view_id: String,
    pub date_ranges: Vec<DateRange>,
    pub metrics: Vec<Metric>,
    pub dimensions: Vec<Dimension>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub segments: Vec<Segment>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Metric {
    pub expression: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Dimension {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub segment_id: String,
}

/// Build the weekly users/duration request.
///
/// With a segment, `ga:segment` becomes the first dimension, which the
/// segment filter requires; rows then carry `[segment, week]`.
pub fn weekly_report_request(
    view_id: &str,
    lookback_days: u32,
    segment: Option<&str>,
) -> BatchGetRequest {
    let mut dimensions = Vec::with_capacity(2);
    if segment.is_some() {
        dimensions.push(Dimension {
            name: SEGMENT_DIMENSION.to_string(),
        });
    }
    dimensions.push(Dimension {
        name: WEEK_DIMENSION.to_string(),
    });

    let segments = segment
        .map(|id| {
            vec![Segment {
                segment_id: id.to_string(),
            }]
        })
        .unwrap_or_default();

    BatchGetRequest {
        report_requests: vec![ReportRequest {
            view_id: view_id.to_string(),
            date_ranges: vec![DateRange {
                start_date: format!("{}daysAgo", lookback_days),
                end_date: "today".to_string(),
            }],
            metrics: vec![
                Metric {
                    expression: USERS_METRIC.to_string(),
                },
                Metric {
                    expression: AVG_SESSION_DURATION_METRIC.to_string(),
                },
            ],
            dimensions,
            segments,
        }],
    }
}

/// Response of a `reports:batchGet` call.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BatchGetResponse {
    #[serde(default)]
    pub reports: Vec<Report>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    #[serde(default)]
    pub column_header: ColumnHeader,
    #[serde(default)]
    pub data: ReportData,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ColumnHeader {
    #[serde(default)]
    pub dimensions: Vec<String>,
    #[serde(default)]
    pub metric_header: MetricHeader,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MetricHeader {
    #[serde(default)]
    pub metric_header_entries: Vec<MetricHeaderEntry>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct MetricHeaderEntry {
    #[allow(dead_code)] // Response field
    pub name: String,
    #[serde(rename = "type", default)]
    #[allow(dead_code)] // Response field
    pub metric_type: String,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReportData {
    #[serde(default)]
    pub rows: Vec<ReportRow>,
    #[serde(default)]
    #[allow(dead_code)] // Response field
    pub row_count: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ReportRow {
    #[serde(default)]
    pub dimensions: Vec<String>,
    /// One entry per date range.
    #[serde(default)]
    pub metrics: Vec<DateRangeValues>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct DateRangeValues {
    #[serde(default)]
    pub values: Vec<String>,
}
