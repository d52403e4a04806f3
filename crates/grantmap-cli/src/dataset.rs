//! JSON dataset loading.
//!
//! Spreadsheet and CSV ingestion live in upstream tooling; the two
//! datasets arrive here as JSON arrays of records.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use grantmap_core::{Grant, Publication};

pub fn load_grants(path: &Path) -> anyhow::Result<Vec<Grant>> {
    let file = File::open(path)?;
    let grants: Vec<Grant> = serde_json::from_reader(BufReader::new(file))?;
    Ok(grants)
}

pub fn load_publications(path: &Path) -> anyhow::Result<Vec<Publication>> {
    let file = File::open(path)?;
    let publications: Vec<Publication> = serde_json::from_reader(BufReader::new(file))?;
    Ok(publications)
}
