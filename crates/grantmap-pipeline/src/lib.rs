//! Batch coordinator: drives a mapping run in fixed-size batches, persists
//! progress and partial results, and recovers from rate limiting.

mod config;
mod coordinator;

pub use config::PipelineConfig;
pub use coordinator::{BatchCoordinator, PipelineError, RunOutcome, RunSummary};
