//! Run-progress document: the single source of truth for resumption.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::StoreError;

/// Durable counters for an in-progress mapping run.
///
/// Created fresh at run start or recovered from disk, mutated after every
/// publication and every external call, persisted after every batch and
/// every rate-limit interruption, deleted on successful completion.
///
/// Invariants: `processed_count` is monotonically non-decreasing and equals
/// `total_publications` exactly at completion; `mapped_count` never exceeds
/// `processed_count`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunProgress {
    pub total_publications: usize,
    pub processed_count: usize,
    pub mapped_count: usize,
    pub batch_number: usize,
    /// Input index of the last publication touched; -1 before any work.
    pub last_processed_index: i64,
    pub api_calls_made: usize,
    pub api_calls_failed: usize,
    /// ISO 8601 time of the last save.
    #[serde(default)]
    pub timestamp: String,
}

impl RunProgress {
    /// Fresh progress for a run over `total_publications` publications.
    pub fn fresh(total_publications: usize) -> Self {
        Self {
            total_publications,
            processed_count: 0,
            mapped_count: 0,
            batch_number: 1,
            last_processed_index: -1,
            api_calls_made: 0,
            api_calls_failed: 0,
            timestamp: String::new(),
        }
    }
}

/// On-disk JSON document holding a [`RunProgress`].
///
/// Saves go through a temporary file in the same directory followed by a
/// rename, so a crash mid-save leaves the previous document intact.
pub struct ProgressStore {
    path: PathBuf,
}

impl ProgressStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted progress, if any. A missing file means a fresh
    /// run; an unreadable or malformed file is an error, since silently
    /// restarting from zero would duplicate already-written results.
    pub fn load(&self) -> Result<Option<RunProgress>, StoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let progress = serde_json::from_str(&raw)?;
        Ok(Some(progress))
    }

    /// Persist the progress, stamping the save time.
    pub fn save(&self, progress: &RunProgress) -> Result<(), StoreError> {
        let mut document = progress.clone();
        document.timestamp = Utc::now().to_rfc3339();

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_string_pretty(&document)?)?;
        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), processed = progress.processed_count, "progress saved");
        Ok(())
    }

    /// Remove the document. A missing file is fine; that is the clean
    /// terminal state.
    pub fn delete(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
