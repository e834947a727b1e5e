//! Google Sheets publishing.
//!
//! Each cohort table goes to one tab of the shared spreadsheet, header
//! row first, starting at the configured anchor cell.

use crate::auth::AccessToken;
use crate::config::SheetsConfig;
use crate::error::{CohortError, Result};
use crate::models::CohortTable;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const SPREADSHEET_MIME_TYPE: &str = "application/vnd.google-apps.spreadsheet";

#[derive(Debug, Deserialize)]
struct DriveFileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMetadata {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
    #[serde(default)]
    index: usize,
}

/// Body of a `values.update` call.
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct ValueRange<'a> {
    range: &'a str,
    major_dimension: &'static str,
    values: &'a [Vec<String>],
}

/// Writes cohort tables into a spreadsheet.
pub struct SheetsClient {
    config: SheetsConfig,
    http_client: reqwest::Client,
    token: AccessToken,
}

impl SheetsClient {
    pub fn new(config: SheetsConfig, http_client: reqwest::Client, token: AccessToken) -> Self {
        Self {
            config,
            http_client,
            token,
        }
    }

    /// Spreadsheet id from config, or the first spreadsheet matching the title.
    pub async fn resolve_spreadsheet_id(&self) -> Result<String> {
        if let Some(id) = self.config.spreadsheet_id.as_deref() {
            if !id.is_empty() {
                return Ok(id.to_string());
            }
        }

        let title = &self.config.spreadsheet_title;
        info!("Looking up spreadsheet '{}'", title);

        let url = endpoint(&self.config.drive_api_url, &["drive", "v3", "files"])?;
        let response = self
            .http_client
            .get(url)
            .bearer_auth(self.token.as_str())
            .query(&[
                ("q", drive_title_query(title)),
                ("fields", "files(id,name)".to_string()),
            ])
            .send()
            .await?;

        let list: DriveFileList = check_status("Drive", response).await?.json().await?;
        let file = list
            .files
            .into_iter()
            .next()
            .ok_or_else(|| CohortError::SpreadsheetNotFound(title.clone()))?;

        debug!("Resolved spreadsheet '{}' to {}", file.name, file.id);
        Ok(file.id)
    }

    /// Tab titles ordered by tab index.
    pub async fn sheet_titles(&self, spreadsheet_id: &str) -> Result<Vec<String>> {
        let url = endpoint(
            &self.config.api_url,
            &["v4", "spreadsheets", spreadsheet_id],
        )?;
        let response = self
            .http_client
            .get(url)
            .bearer_auth(self.token.as_str())
            .query(&[("fields", "sheets.properties(title,index)")])
            .send()
            .await?;

        let metadata: SpreadsheetMetadata = check_status("Sheets", response).await?.json().await?;
        let mut properties: Vec<SheetProperties> =
            metadata.sheets.into_iter().map(|s| s.properties).collect();
        properties.sort_by_key(|p| p.index);

        Ok(properties.into_iter().map(|p| p.title).collect())
    }

    /// Write a grid at the anchor, replacing the previous table.
    ///
    /// Only the grid's columns from the anchor row down are cleared first,
    /// so cells outside the table span are kept.
    async fn write_grid(
        &self,
        spreadsheet_id: &str,
        sheet_title: &str,
        grid: &[Vec<String>],
    ) -> Result<()> {
        let width = grid.iter().map(Vec::len).max().unwrap_or(0);
        let clear = clear_range(sheet_title, &self.config.anchor, width)?;

        let clear_url = endpoint(
            &self.config.api_url,
            &[
                "v4",
                "spreadsheets",
                spreadsheet_id,
                "values",
                &format!("{}:clear", clear),
            ],
        )?;
        debug!("Clearing {}", clear);
        let response = self
            .http_client
            .post(clear_url)
            .bearer_auth(self.token.as_str())
            .json(&serde_json::json!({}))
            .send()
            .await?;
        check_status("Sheets", response).await?;

        let range = a1_range(sheet_title, &self.config.anchor);
        let update_url = endpoint(
            &self.config.api_url,
            &["v4", "spreadsheets", spreadsheet_id, "values", &range],
        )?;
        let body = ValueRange {
            range: &range,
            major_dimension: "ROWS",
            values: grid,
        };

        let response = self
            .http_client
            .put(update_url)
            .bearer_auth(self.token.as_str())
            .query(&[("valueInputOption", "USER_ENTERED")])
            .json(&body)
            .send()
            .await?;
        check_status("Sheets", response).await?;

        Ok(())
    }

    /// Publish every table to the tab configured for its group.
    pub async fn publish(&self, tables: &[CohortTable]) -> Result<String> {
        let spreadsheet_id = self.resolve_spreadsheet_id().await?;
        let titles = self.sheet_titles(&spreadsheet_id).await?;
        debug!("Spreadsheet {} tabs: {:?}", spreadsheet_id, titles);

        for table in tables {
            let tab = self.config.tab_for(table.group);
            let title = tab_title(&titles, tab)?;

            self.write_grid(&spreadsheet_id, title, &table.to_grid())
                .await?;
            info!(
                "Published group {} ({} rows) to tab '{}'",
                table.group,
                table.rows.len(),
                title
            );
        }

        Ok(spreadsheet_id)
    }
}

/// Append path segments to a base URL, encoding each one.
fn endpoint(base: &str, segments: &[&str]) -> Result<Url> {
    let mut url = Url::parse(base)
        .map_err(|e| CohortError::Config(format!("invalid API url '{}': {}", base, e)))?;
    url.path_segments_mut()
        .map_err(|_| CohortError::Config(format!("API url cannot be a base: {}", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

async fn check_status(service: &'static str, response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(CohortError::Api {
        service,
        status: status.as_u16(),
        body,
    })
}

fn drive_title_query(title: &str) -> String {
    let escaped = title.replace('\\', "\\\\").replace('\'', "\\'");
    format!(
        "name = '{}' and mimeType = '{}' and trashed = false",
        escaped, SPREADSHEET_MIME_TYPE
    )
}

/// Sheet title as used in A1 notation, with embedded quotes doubled.
fn quote_sheet_title(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

fn a1_range(sheet_title: &str, anchor: &str) -> String {
    format!("{}!{}", quote_sheet_title(sheet_title), anchor)
}

/// Split an A1 cell like `B2` into a zero-based column and a row number.
fn parse_cell(cell: &str) -> Option<(usize, u32)> {
    let split = cell.find(|c: char| !c.is_ascii_alphabetic())?;
    let (letters, digits) = cell.split_at(split);
    if letters.is_empty() {
        return None;
    }

    let column = letters
        .chars()
        .fold(0usize, |acc, c| acc * 26 + (c.to_ascii_uppercase() as usize - 'A' as usize + 1));
    let row = digits.parse::<u32>().ok().filter(|&r| r > 0)?;
    Some((column - 1, row))
}

fn column_letters(mut index: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push((b'A' + (index % 26) as u8) as char);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    letters.iter().rev().collect()
}

/// Columns the grid occupies, open-ended downwards from the anchor row.
fn clear_range(sheet_title: &str, anchor: &str, width: usize) -> Result<String> {
    let (column, row) = parse_cell(anchor)
        .ok_or_else(|| CohortError::Config(format!("invalid anchor cell: {}", anchor)))?;
    let last = column + width.max(1) - 1;

    Ok(format!(
        "{}!{}{}:{}",
        quote_sheet_title(sheet_title),
        column_letters(column),
        row,
        column_letters(last)
    ))
}

fn tab_title(titles: &[String], index: usize) -> Result<&str> {
    titles
        .get(index)
        .map(String::as_str)
        .ok_or(CohortError::SheetNotFound(index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_a1_range() {
        assert_eq!(a1_range("Sheet1", "A1"), "'Sheet1'!A1");
        assert_eq!(a1_range("Bob's Tab", "B2"), "'Bob''s Tab'!B2");
    }

    #[test]
    fn test_clear_range_starts_at_anchor() {
        assert_eq!(clear_range("All", "A1", 6).unwrap(), "'All'!A1:F");
        assert_eq!(clear_range("All", "B2", 6).unwrap(), "'All'!B2:G");
        assert_eq!(clear_range("All", "z10", 3).unwrap(), "'All'!Z10:AB");
        assert_eq!(clear_range("All", "C3", 0).unwrap(), "'All'!C3:C");
        assert!(matches!(
            clear_range("All", "3C", 6),
            Err(CohortError::Config(_))
        ));
    }

    #[test]
    fn test_column_letters() {
        assert_eq!(column_letters(0), "A");
        assert_eq!(column_letters(25), "Z");
        assert_eq!(column_letters(26), "AA");
        assert_eq!(column_letters(701), "ZZ");
        assert_eq!(column_letters(702), "AAA");
        assert_eq!(parse_cell("AA7"), Some((26, 7)));
        assert_eq!(parse_cell("A0"), None);
    }

    #[test]
    fn test_tab_title() {
        let titles = vec!["All".to_string(), "Members".to_string()];
        assert_eq!(tab_title(&titles, 1).unwrap(), "Members");
        assert!(matches!(
            tab_title(&titles, 2),
            Err(CohortError::SheetNotFound(2))
        ));
    }

    #[test]
    fn test_endpoint_encodes_segments() {
        let url = endpoint(
            "https://sheets.googleapis.com",
            &["v4", "spreadsheets", "abc", "values", "'My Tab'!A1"],
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/abc/values/'My%20Tab'!A1"
        );
    }

    #[test]
    fn test_endpoint_with_trailing_slash() {
        let url = endpoint("http://localhost:8080/", &["drive", "v3", "files"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/drive/v3/files");
    }

    #[test]
    fn test_endpoint_rejects_bad_base() {
        assert!(endpoint("not a url", &["v4"]).is_err());
    }

    #[test]
    fn test_drive_title_query() {
        assert_eq!(
            drive_title_query("Cohort Analysis"),
            "name = 'Cohort Analysis' and mimeType = 'application/vnd.google-apps.spreadsheet' and trashed = false"
        );
        assert!(drive_title_query("Bob's").starts_with("name = 'Bob\\'s'"));
    }

    #[test]
    fn test_value_range_body() {
        let grid = vec![
            vec!["week".to_string(), "num_users".to_string()],
            vec!["0".to_string(), "12".to_string()],
        ];
        let body = ValueRange {
            range: "'Sheet1'!A1",
            major_dimension: "ROWS",
            values: &grid,
        };

        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "range": "'Sheet1'!A1",
                "majorDimension": "ROWS",
                "values": [["week", "num_users"], ["0", "12"]]
            })
        );
    }

    #[test]
    fn test_parse_spreadsheet_metadata() {
        let metadata: SpreadsheetMetadata = serde_json::from_value(json!({
            "sheets": [
                {"properties": {"title": "Group A", "index": 2}},
                {"properties": {"title": "All", "index": 0}},
                {"properties": {"title": "Group B", "index": 1}}
            ]
        }))
        .unwrap();

        let mut props: Vec<SheetProperties> =
            metadata.sheets.into_iter().map(|s| s.properties).collect();
        props.sort_by_key(|p| p.index);
        let titles: Vec<&str> = props.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["All", "Group B", "Group A"]);
    }

    #[tokio::test]
    async fn test_configured_spreadsheet_id_skips_lookup() {
        let config = SheetsConfig {
            spreadsheet_id: Some("sheet-42".to_string()),
            // unroutable: a lookup would fail
            drive_api_url: "http://127.0.0.1:9".to_string(),
            ..Default::default()
        };
        let client = SheetsClient::new(config, reqwest::Client::new(), AccessToken::new("t"));

        assert_eq!(client.resolve_spreadsheet_id().await.unwrap(), "sheet-42");
    }
}
