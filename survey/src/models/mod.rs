//! Domain models for the survey report pipeline.
//!
//! - [`RawResponse`] - one survey row, field code to value
//! - [`ReferenceEntry`] - one row of the tool reference table
//! - [`Basis`] - identity fields copied onto every derived record
//! - [`Respondent`] - a normalized, weighted survey participant
//! - [`ObservationRow`] - one (respondent, tool, discipline) expansion unit

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// =============================================================================
// Raw input
// =============================================================================

/// One survey row, keyed by field code.
///
/// Codes absent from the row read as the empty string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawResponse {
    fields: HashMap<String, String>,
}

impl RawResponse {
    /// Value at `code`, or `""` when the field is missing.
    pub fn get(&self, code: &str) -> &str {
        self.fields.get(code).map(String::as_str).unwrap_or("")
    }

    /// Whether the value at `code` has any non-whitespace content.
    pub fn is_filled(&self, code: &str) -> bool {
        !self.get(code).trim().is_empty()
    }

    /// Build a row from `(code, value)` pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// One row of the tool reference table (`tool`, `famille`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceEntry {
    pub tool: String,
    /// Tool family. Blank means the tool is uncategorized.
    #[serde(rename = "famille", default)]
    pub category: String,
}

impl ReferenceEntry {
    pub fn new(tool: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            category: category.into(),
        }
    }
}

// =============================================================================
// Respondent
// =============================================================================

/// Identity fields of a respondent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Basis {
    pub id: String,
    pub role: String,
    pub last_affiliation_country: String,
    pub first_publication_year: String,
}

/// A normalized survey participant.
///
/// `tools` and `disciplines` are never empty: disciplines fall back to the
/// unknown sentinel, and respondents without tools are either dropped or
/// given the sentinel tool during extraction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Respondent {
    pub basis: Basis,
    /// Display labels, in indicator order.
    pub disciplines: Vec<String>,
    /// Discipline categories reached through `disciplines`, in enumeration order.
    pub discipline_categories: Vec<String>,
    /// Tool names, free-text entries first, then indicator order.
    pub tools: Vec<String>,
    /// `1 / |disciplines|`
    pub discipline_weight: f64,
    /// `1 / |discipline_categories|`, or 0 when no category applies.
    pub discipline_category_weight: f64,
}

impl Respondent {
    pub fn has_discipline(&self, discipline: &str) -> bool {
        self.disciplines.iter().any(|d| d == discipline)
    }
}

// =============================================================================
// Observation
// =============================================================================

/// One (respondent, tool, discipline) triple.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObservationRow {
    pub basis: Basis,
    pub tool: String,
    pub tool_category: String,
    pub discipline: String,
    /// `None` when the discipline has no category (the unknown sentinel).
    pub discipline_category: Option<String>,
    /// `1 / (|tools| + |disciplines|)` of the owning respondent.
    pub weight: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_reads_empty() {
        let row = RawResponse::from_pairs([("PHYS", "1")]);
        assert_eq!(row.get("PHYS"), "1");
        assert_eq!(row.get("LAW"), "");
        assert!(!row.is_filled("LAW"));
    }

    #[test]
    fn test_whitespace_is_not_filled() {
        let row = RawResponse::from_pairs([("WORD", "   ")]);
        assert!(!row.is_filled("WORD"));
    }

    #[test]
    fn test_reference_entry_famille_header() {
        let entry: ReferenceEntry =
            serde_json::from_str(r#"{"tool": "Overleaf", "famille": "latex"}"#).unwrap();
        assert_eq!(entry, ReferenceEntry::new("Overleaf", "latex"));

        let blank: ReferenceEntry = serde_json::from_str(r#"{"tool": "Ulysses"}"#).unwrap();
        assert_eq!(blank.category, "");
    }

    #[test]
    fn test_respondent_has_discipline() {
        let respondent = Respondent {
            basis: Basis::default(),
            disciplines: vec!["Droit".into()],
            discipline_categories: vec!["Droit".into()],
            tools: vec!["Word".into(), "Zotero".into()],
            discipline_weight: 1.0,
            discipline_category_weight: 1.0,
        };
        assert!(respondent.has_discipline("Droit"));
        assert!(!respondent.has_discipline("Médecine"));
    }
}
