//! Weekly engagement aggregates from the relational store.

pub mod queries;
pub mod runner;

pub use runner::EngagementRunner;
