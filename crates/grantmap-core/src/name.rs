//! Person-name normalisation and author/investigator matching.
//!
//! The matcher is deliberately permissive: it sits in front of an expensive
//! relevance judgment, so a false positive costs one extra judgment call
//! while a false negative loses a mapping outright.

use std::collections::HashSet;

/// Honorific tokens stripped during normalisation, matched as whole words
/// with an optional trailing period.
const HONORIFICS: &[&str] = &["dr", "prof", "professor", "phd", "md"];

/// Normalise a person name for comparison: lowercase, honorifics removed,
/// whitespace collapsed. An absent name normalises to the empty string.
pub fn normalize_name(name: Option<&str>) -> String {
    let Some(raw) = name else {
        return String::new();
    };

    let lowered = raw.to_lowercase();
    let kept: Vec<&str> = lowered
        .split_whitespace()
        .filter(|token| {
            let bare = token.strip_suffix('.').unwrap_or(token);
            !HONORIFICS.contains(&bare)
        })
        .collect();
    kept.join(" ")
}

/// Decide whether a publication author matches one of a grant's
/// investigators. Returns the first matching investigator name, verbatim.
///
/// Two rules, tried per investigator in source order:
///
/// 1. Exact equality of the normalised names.
/// 2. Token overlap: both names split into at least two whitespace tokens
///    and the token sets share at least `min(2, |author|, |investigator|)`
///    tokens.
///
/// Single-token names (a bare surname) can only match via rule 1. Empty
/// normalised names never match.
pub fn match_investigator<'a>(author: &str, investigators: &[&'a str]) -> Option<&'a str> {
    let author_norm = normalize_name(Some(author));

    for &investigator in investigators {
        let inv_norm = normalize_name(Some(investigator));

        if !author_norm.is_empty() && author_norm == inv_norm {
            return Some(investigator);
        }

        let author_tokens: HashSet<&str> = author_norm.split_whitespace().collect();
        let inv_tokens: HashSet<&str> = inv_norm.split_whitespace().collect();

        if author_tokens.len() >= 2 && inv_tokens.len() >= 2 {
            let common = author_tokens.intersection(&inv_tokens).count();
            if common >= 2.min(author_tokens.len()).min(inv_tokens.len()) {
                return Some(investigator);
            }
        }
    }

    None
}
