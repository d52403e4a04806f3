//! Core domain records and candidate-reduction heuristics.
//!
//! Everything here is pure: the matching and scoring functions take records
//! in and produce candidates out, with no I/O. The expensive external
//! judgment and the durable run state live in the sibling crates.

pub mod candidate;
pub mod confidence;
pub mod name;
pub mod record;
pub mod temporal;

pub use candidate::{AuthorMatch, CandidateGrant, select_candidates};
pub use confidence::{BestMatch, Confidence, Judgment};
pub use name::{match_investigator, normalize_name};
pub use record::{Grant, Publication};
pub use temporal::temporal_score;
