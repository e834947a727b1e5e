//! Spreadsheet publishing.

pub mod publisher;

pub use publisher::SheetsClient;

