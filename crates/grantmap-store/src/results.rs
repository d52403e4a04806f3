//! Row-oriented result tables: the cumulative results store and the
//! rate-limit checkpoint store share one CSV shape.

use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use grantmap_core::{Judgment, Publication};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::StoreError;

/// One output row per input publication, plus the four derived columns.
/// The derived columns are empty when the publication is unmapped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRow {
    pub title: String,
    pub year: i32,
    /// Author display names joined with "; ".
    pub authors: String,
    pub doi: String,
    pub associated_grant: String,
    pub grant_code: String,
    pub confidence: String,
    pub reasoning: String,
}

impl ResultRow {
    /// Build the output row for a publication, filling the derived columns
    /// from the winning judgment when one exists.
    pub fn from_publication(publication: &Publication, judgment: Option<&Judgment>) -> Self {
        let (associated_grant, grant_code, confidence, reasoning) = match judgment {
            Some(j) => (
                j.grant_title.clone(),
                j.grant_code.clone(),
                j.confidence.as_str().to_string(),
                j.reasoning.clone(),
            ),
            None => Default::default(),
        };
        Self {
            title: publication.title.clone(),
            year: publication.year,
            authors: publication.authors.join("; "),
            doi: publication.doi.clone().unwrap_or_default(),
            associated_grant,
            grant_code,
            confidence,
            reasoning,
        }
    }
}

/// Header record, kept in sync with the field order of [`ResultRow`].
const HEADERS: &[&str] = &[
    "title",
    "year",
    "authors",
    "doi",
    "associated_grant",
    "grant_code",
    "confidence",
    "reasoning",
];

/// An append-only CSV table of [`ResultRow`]s.
///
/// The cumulative results store is initialised with a header at the start
/// of a fresh run and receives one batch of rows at a time; the checkpoint
/// store is only ever appended to when a rate limit truncates a batch, so
/// successive interruptions accumulate rather than overwrite.
pub struct ResultTable {
    path: PathBuf,
}

impl ResultTable {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Create the table holding only the header row, truncating any prior
    /// content.
    pub fn init(&self) -> Result<(), StoreError> {
        let mut writer = csv::Writer::from_path(&self.path)?;
        writer.write_record(HEADERS)?;
        writer.flush()?;
        Ok(())
    }

    /// Append rows, creating the table (with header) first if needed.
    pub fn append(&self, rows: &[ResultRow]) -> Result<(), StoreError> {
        if rows.is_empty() {
            return Ok(());
        }

        let write_headers = !self.path.exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(write_headers)
            .from_writer(file);
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        debug!(path = %self.path.display(), rows = rows.len(), "rows appended");
        Ok(())
    }

    /// Read every row back. A missing table yields an empty list.
    pub fn read_all(&self) -> Result<Vec<ResultRow>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::Reader::from_path(&self.path)?;
        let mut rows = Vec::new();
        for record in reader.deserialize() {
            rows.push(record?);
        }
        Ok(rows)
    }

    /// Remove the table. A missing file is fine; that is the clean
    /// terminal state.
    pub fn delete(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
