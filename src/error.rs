//! Error types for the cohort pipeline.
//!
//! Every collaborator failure maps onto one variant here. Nothing is
//! retried: the first error aborts the run.

use thiserror::Error;

/// Errors raised while building or publishing a cohort table.
#[derive(Error, Debug)]
pub enum CohortError {
    /// Invalid or missing configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Service-account key file could not be read or parsed
    #[error("Credential file error: {0}")]
    Credentials(String),

    /// Token exchange with the OAuth endpoint failed
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// HTTP transport failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A Google API answered with a non-success status
    #[error("{service} API returned {status}: {body}")]
    Api {
        service: &'static str,
        status: u16,
        body: String,
    },

    /// Analytics response did not have the expected row shape
    #[error("Malformed analytics report: {0}")]
    MalformedReport(String),

    /// Database connection or query errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// No spreadsheet matched the configured title
    #[error("Spreadsheet not found: {0}")]
    SpreadsheetNotFound(String),

    /// The spreadsheet has no tab at the requested index
    #[error("Spreadsheet has no tab at index {0}")]
    SheetNotFound(usize),
}

/// Convenience Result type using [`CohortError`]
pub type Result<T> = std::result::Result<T, CohortError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = CohortError::Api {
            service: "Sheets",
            status: 403,
            body: "forbidden".to_string(),
        };
        assert_eq!(err.to_string(), "Sheets API returned 403: forbidden");
    }

    #[test]
    fn test_sheet_not_found_display() {
        assert_eq!(
            CohortError::SheetNotFound(2).to_string(),
            "Spreadsheet has no tab at index 2"
        );
    }
}
