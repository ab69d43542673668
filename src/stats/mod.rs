//! Pipeline statistics

pub mod metrics;

pub use metrics::{PipelineSnapshot, PipelineStats};
