//! Input records for a mapping run.
//!
//! Grants and publications are read-only inputs owned by the caller; the
//! pipeline never mutates them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A research grant as loaded from the grants dataset.
///
/// A grant is matchable only if it names at least one investigator.
/// Expected invariant: `end_date >= start_date`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grant {
    /// Funder-assigned project code, e.g. "BD-2019-014".
    pub code: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Preferred full name of the lead investigator.
    #[serde(default)]
    pub lead_investigator: Option<String>,
    /// Co-investigators, in the order given by the source record.
    #[serde(default)]
    pub other_investigators: Vec<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl Grant {
    /// All investigator names, lead first, in source order.
    pub fn investigators(&self) -> Vec<&str> {
        let mut names = Vec::with_capacity(1 + self.other_investigators.len());
        if let Some(lead) = self.lead_investigator.as_deref() {
            names.push(lead);
        }
        names.extend(self.other_investigators.iter().map(String::as_str));
        names
    }
}

/// A publication as loaded from the publications dataset.
///
/// A publication with an empty author list can never match a grant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Publication {
    pub title: String,
    /// 4-digit calendar year of publication.
    pub year: i32,
    /// Author display names, in byline order.
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub doi: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn investigators_lead_first() {
        let grant = Grant {
            code: "G-1".into(),
            title: "Neural circuits".into(),
            description: None,
            lead_investigator: Some("Jane Doe".into()),
            other_investigators: vec!["Bob Wilson".into(), "Ann Lee".into()],
            start_date: date(2019, 1, 1),
            end_date: date(2021, 12, 31),
        };
        assert_eq!(grant.investigators(), vec!["Jane Doe", "Bob Wilson", "Ann Lee"]);
    }

    #[test]
    fn investigators_empty_when_no_names() {
        let grant = Grant {
            code: "G-2".into(),
            title: "Untitled".into(),
            description: None,
            lead_investigator: None,
            other_investigators: vec![],
            start_date: date(2019, 1, 1),
            end_date: date(2020, 1, 1),
        };
        assert!(grant.investigators().is_empty());
    }

    #[test]
    fn grant_json_roundtrip() {
        let json = r#"{
            "code": "BD-2019-014",
            "title": "Gut microbiome and cognition",
            "lead_investigator": "Dr. Martin Williams",
            "other_investigators": ["Jane Doe"],
            "start_date": "2019-03-01",
            "end_date": "2022-02-28"
        }"#;
        let grant: Grant = serde_json::from_str(json).unwrap();
        assert_eq!(grant.code, "BD-2019-014");
        assert!(grant.description.is_none());
        assert_eq!(grant.start_date, date(2019, 3, 1));
        assert_eq!(grant.investigators().len(), 2);
    }

    #[test]
    fn publication_json_defaults() {
        let json = r#"{"title": "A study", "year": 2021}"#;
        let publication: Publication = serde_json::from_str(json).unwrap();
        assert!(publication.authors.is_empty());
        assert!(publication.doi.is_none());
    }
}
