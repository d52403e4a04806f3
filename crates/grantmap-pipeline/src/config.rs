//! Pipeline tuning knobs.

use std::path::PathBuf;
use std::time::Duration;

/// Tuning for the batch coordinator.
///
/// Defaults mirror the envelope the scoring backend tolerates: 20
/// publications per batch, 2 judged candidates per publication, a 2 s
/// throttle between calls, and a 60 s backoff after a rate limit.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Publications per batch.
    pub batch_size: usize,
    /// Candidates judged per publication.
    pub max_candidates: usize,
    /// Client-side throttle after each answered judge call.
    pub call_delay: Duration,
    /// Pause before retrying after a rate-limit interruption.
    pub backoff: Duration,
    /// Consecutive rate-limit interruptions tolerated (with backoff)
    /// before the run exits paused, leaving its stores on disk.
    pub max_backoffs: u32,
    pub progress_path: PathBuf,
    pub checkpoint_path: PathBuf,
    pub results_path: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: 20,
            max_candidates: 2,
            call_delay: Duration::from_secs(2),
            backoff: Duration::from_secs(60),
            max_backoffs: 3,
            progress_path: PathBuf::from("processing_progress.json"),
            checkpoint_path: PathBuf::from("checkpoint_results.csv"),
            results_path: PathBuf::from("mapped_publications.csv"),
        }
    }
}

impl PipelineConfig {
    /// Re-root all store paths under the given directory, keeping file
    /// names. Convenient for tests and for a `--work-dir` style override.
    pub fn with_store_dir(mut self, dir: &std::path::Path) -> Self {
        for path in [
            &mut self.progress_path,
            &mut self.checkpoint_path,
            &mut self.results_path,
        ] {
            if let Some(name) = path.file_name() {
                *path = dir.join(name);
            }
        }
        self
    }
}
