//! Candidate selection: the two heuristic gates plus ranking and truncation.

use crate::name::match_investigator;
use crate::record::{Grant, Publication};
use crate::temporal::temporal_score;

/// One author/investigator pairing that justified a candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorMatch {
    pub author: String,
    pub investigator: String,
}

/// A (publication, grant) pairing that survived both heuristic gates.
///
/// Created fresh per publication during selection, never persisted, and
/// discarded once the publication's best match is resolved.
#[derive(Debug, Clone)]
pub struct CandidateGrant<'a> {
    pub grant: &'a Grant,
    /// Matched author → investigator pairs, in author-list order.
    pub matches: Vec<AuthorMatch>,
    /// Temporal alignment score in `(0, 1]`.
    pub temporal_score: f64,
}

impl CandidateGrant<'_> {
    /// Ranking key: temporal score weighted by the number of matched pairs.
    pub fn rank(&self) -> f64 {
        self.temporal_score * self.matches.len() as f64
    }
}

/// Scan all grants for one publication and return the ranked, truncated
/// candidate list.
///
/// Both gates are mandatory: a grant with no matched author, or with a
/// temporal score of zero, is skipped outright. Survivors are sorted
/// descending by [`CandidateGrant::rank`]; the sort is stable, so ties keep
/// the original grant order. At most `max_candidates` entries are returned
/// to bound the number of judgment calls spent on one publication.
pub fn select_candidates<'a>(
    publication: &Publication,
    grants: &'a [Grant],
    max_candidates: usize,
) -> Vec<CandidateGrant<'a>> {
    let mut candidates = Vec::new();

    for grant in grants {
        let investigators = grant.investigators();
        if investigators.is_empty() {
            continue;
        }

        let mut matches = Vec::new();
        for author in &publication.authors {
            if let Some(investigator) = match_investigator(author, &investigators) {
                matches.push(AuthorMatch {
                    author: author.clone(),
                    investigator: investigator.to_string(),
                });
            }
        }
        if matches.is_empty() {
            continue;
        }

        let score = temporal_score(publication.year, grant.start_date, grant.end_date);
        if score == 0.0 {
            continue;
        }

        candidates.push(CandidateGrant {
            grant,
            matches,
            temporal_score: score,
        });
    }

    candidates.sort_by(|a, b| {
        b.rank()
            .partial_cmp(&a.rank())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    candidates.truncate(max_candidates);
    candidates
}
