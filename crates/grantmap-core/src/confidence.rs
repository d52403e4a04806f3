//! Ordinal confidence levels, judgment results, and best-match folding.

use serde::{Deserialize, Serialize};

/// Topical-alignment confidence reported by the relevance judge.
///
/// Forms a total order: `VeryLow < Low < Medium < High < VeryHigh`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Confidence {
    #[serde(rename = "Very Low")]
    VeryLow,
    Low,
    Medium,
    High,
    #[serde(rename = "Very High")]
    VeryHigh,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VeryLow => "Very Low",
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::VeryHigh => "Very High",
        }
    }

    /// Parse a wire token like `"Very High"`. Returns `None` for anything
    /// outside the five recognised tokens.
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim() {
            "Very Low" => Some(Self::VeryLow),
            "Low" => Some(Self::Low),
            "Medium" => Some(Self::Medium),
            "High" => Some(Self::High),
            "Very High" => Some(Self::VeryHigh),
            _ => None,
        }
    }
}

/// One relevance judgment for a (publication, candidate grant) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Judgment {
    pub grant_title: String,
    pub grant_code: String,
    pub confidence: Confidence,
    pub reasoning: String,
}

/// Folds the judgments for one publication down to the single best one
/// under the confidence total order.
///
/// The first judgment seen wins ties, so callers must offer judgments in
/// candidate-selection order.
#[derive(Debug, Default)]
pub struct BestMatch {
    best: Option<Judgment>,
}

impl BestMatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consider one judgment; it replaces the current best only when its
    /// confidence is strictly higher.
    pub fn offer(&mut self, judgment: Judgment) {
        match &self.best {
            Some(current) if judgment.confidence <= current.confidence => {}
            _ => self.best = Some(judgment),
        }
    }

    /// The winning judgment, or `None` when nothing was offered; the
    /// publication is then left unmapped for this run.
    pub fn into_best(self) -> Option<Judgment> {
        self.best
    }
}
