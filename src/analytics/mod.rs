//! Web analytics fetching and flattening.
//!
//! This module provides the Analytics Reporting API client and the
//! conversion of its nested response into a per-week table.

pub mod client;
pub mod request;
pub mod table;

pub use client::AnalyticsClient;
