//! Prompt construction for the topical-alignment judgment.

use grantmap_core::{CandidateGrant, Publication};

/// System instruction constraining the assistant to concise topical
/// assessment.
pub(crate) const SYSTEM_PROMPT: &str = "You are a research analyst assessing topical \
relationships between grants and publications. Be concise and focus only on content \
alignment.";

/// Build the user message for one (publication, candidate) pair.
///
/// Investigator and temporal alignment are established by construction, so
/// the request asks for topical alignment only, on the five-point scale,
/// with a strictly-JSON reply.
pub(crate) fn build_user_prompt(
    publication: &Publication,
    candidate: &CandidateGrant<'_>,
) -> String {
    let matched: Vec<String> = candidate
        .matches
        .iter()
        .map(|m| format!("{} -> {}", m.author, m.investigator))
        .collect();

    format!(
        "You are analyzing a pre-filtered publication-grant pair that has already been \
confirmed to have:\n\
- Matching investigators: {matched}\n\
- Valid timing alignment (publication within grant period + 2 years)\n\
\n\
Now assess the TOPICAL RELATIONSHIP between this grant and publication:\n\
\n\
GRANT:\n\
Title: {grant_title}\n\
Description: {grant_description}\n\
\n\
PUBLICATION:\n\
Title: {publication_title}\n\
Publication Year: {publication_year}\n\
\n\
Based on the research topics and content, rate the likelihood this publication \
resulted from this grant:\n\
\n\
- Very High: Perfect topical alignment, publication clearly addresses grant objectives\n\
- High: Strong topical overlap, publication likely resulted from grant work\n\
- Medium: Moderate topical connection, possible relationship\n\
- Low: Minimal topical alignment, unlikely direct relationship\n\
- Very Low: No clear topical connection despite investigator/timing match\n\
\n\
Respond in JSON format:\n\
{{\n\
    \"confidence\": \"Very High|High|Medium|Low|Very Low\",\n\
    \"reasoning\": \"Brief explanation focusing on topical alignment\"\n\
}}",
        matched = matched.join(", "),
        grant_title = candidate.grant.title,
        grant_description = candidate.grant.description.as_deref().unwrap_or("Not provided"),
        publication_title = publication.title,
        publication_year = publication.year,
    )
}
