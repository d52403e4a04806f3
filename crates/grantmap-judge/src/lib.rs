//! Relevance judgment: builds the external scoring request for one
//! (publication, candidate) pair and classifies the reply.
//!
//! The heuristics in `grantmap-core` establish investigator and temporal
//! alignment by construction, so the judge asks the scoring backend for
//! topical alignment only.

mod client;
mod prompt;
mod response;

pub use client::{JudgeConfig, JudgeError, LlmJudge};

use async_trait::async_trait;
use grantmap_core::{CandidateGrant, Judgment, Publication};

/// Outcome of one judgment call.
///
/// `RateLimited` is the only outcome allowed to interrupt a batch; every
/// other failure mode degrades to an `Answered` judgment with Low
/// confidence so the candidate loop always terminates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JudgeOutcome {
    /// An answer was obtained, possibly a degraded low-confidence one.
    Answered,
    /// The backend refused the call; the caller must stop issuing calls
    /// and enter the recovery path.
    RateLimited,
}

/// A relevance judge scoring the topical alignment of a candidate pairing.
///
/// The pipeline drives this trait; [`LlmJudge`] is the HTTP-backed
/// implementation, and tests substitute scripted judges.
#[async_trait]
pub trait Judge: Send + Sync {
    async fn judge(
        &self,
        publication: &Publication,
        candidate: &CandidateGrant<'_>,
    ) -> (Judgment, JudgeOutcome);
}
