//! Reply parsing: first-JSON-object extraction and confidence decoding.

use grantmap_core::Confidence;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct ReplyBody {
    confidence: Option<String>,
    reasoning: Option<String>,
}

/// Parsed fields of a judgment reply.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct ParsedReply {
    pub confidence: Confidence,
    pub reasoning: String,
}

/// Extract the first `{...}` span from the reply text and decode the
/// judgment object out of it.
///
/// Returns `None` when no such span exists, the span is not valid JSON, or
/// the `confidence` field is missing or not one of the five recognised
/// tokens. A missing `reasoning` falls back to a short note rather than
/// failing the parse.
pub(crate) fn parse_reply(content: &str) -> Option<ParsedReply> {
    let span = extract_object_span(content)?;
    let body: ReplyBody = serde_json::from_str(span).ok()?;
    let confidence = Confidence::parse(&body.confidence?)?;
    Some(ParsedReply {
        confidence,
        reasoning: body.reasoning.unwrap_or_else(|| "No reasoning given".into()),
    })
}

/// The span from the first `{` to the last `}`, mirroring how the reply
/// contract is defined: a single JSON object somewhere in free text.
fn extract_object_span(content: &str) -> Option<&str> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&content[start..=end])
}
