//! Cohort table assembly and the per-group pipeline.

pub mod assembler;
pub mod pipeline;
pub mod traits;

pub use pipeline::CohortPipeline;
pub use traits::{AnalyticsSource, EngagementSource};
