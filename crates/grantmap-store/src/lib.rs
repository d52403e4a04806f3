//! Durable run state: the progress document plus the checkpoint and
//! cumulative-results tables.
//!
//! The progress document and the checkpoint exist only to make an
//! in-progress run resumable and are removed once a run completes cleanly;
//! the results table is the product.

mod error;
mod progress;
mod results;

pub use error::StoreError;
pub use progress::{ProgressStore, RunProgress};
pub use results::{ResultRow, ResultTable};
