//! Survey layout and run options.
//!
//! [`SurveyLayout`] describes where things live in a survey row: the basis
//! sub-fields, the discipline and tool indicator codes, label translations
//! and the discipline-category mapping. Its `Default` is the layout of the
//! writing-tools survey; other surveys load a JSON file with the same shape
//! (missing keys fall back to the defaults).
//!
//! [`ReportOptions`] holds the knobs of a single run.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use crate::error::{ConfigError, ConfigResult};

/// Sentinel for a missing discipline or tool.
pub const UNKNOWN: &str = "unknown";

/// Category of tools absent from the reference table or with a blank family.
pub const OTHER_CATEGORY: &str = "other";

/// Catch-all answer removed from tool selections.
pub const OTHERS_MARKER: &str = "(and also) others";

/// Tool family left out of the "no WYSIWYG" tables.
pub const DEFAULT_EXCLUDED_TOOL_CATEGORY: &str = "wysiwyg bureautique";

// =============================================================================
// Layout
// =============================================================================

/// Source sub-fields for each basis key, concatenated without separator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasisFields {
    pub id: Vec<String>,
    pub role: Vec<String>,
    #[serde(rename = "last affiliation country")]
    pub last_affiliation_country: Vec<String>,
    #[serde(rename = "first publication year")]
    pub first_publication_year: Vec<String>,
}

impl Default for BasisFields {
    fn default() -> Self {
        Self {
            id: vec!["ID".into()],
            role: vec!["ROLE".into()],
            last_affiliation_country: vec!["COUNTRYCL".into()],
            first_publication_year: vec!["PUBYEAR".into()],
        }
    }
}

/// A discipline checkbox column and the English label it stands for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisciplineIndicator {
    pub code: String,
    pub label: String,
}

impl DisciplineIndicator {
    pub fn new(code: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            label: label.into(),
        }
    }
}

/// Where disciplines, tools and identity fields live in a survey row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurveyLayout {
    pub basis: BasisFields,

    /// Discipline indicators, in selection order.
    pub disciplines: Vec<DisciplineIndicator>,

    /// English label -> display label. Untranslated labels display as-is.
    pub translations: BTreeMap<String, String>,

    /// Display label -> discipline category. The single source of truth for
    /// category membership; the reverse index is derived from it.
    pub discipline_categories: BTreeMap<String, String>,

    /// Discipline category enumeration, in report order.
    pub category_order: Vec<String>,

    /// Tool indicator columns, in selection order.
    pub tool_codes: Vec<String>,

    /// Values meaning "ticked" rather than naming the tool. A ticked
    /// indicator contributes its own code as tool name.
    pub checkbox_markers: Vec<String>,

    /// Comma-separated free-text tools column.
    pub free_text_tools: String,

    pub unknown: String,
    pub other_category: String,
    pub others_marker: String,
}

impl Default for SurveyLayout {
    fn default() -> Self {
        let disciplines = vec![
            DisciplineIndicator::new("PHYS", "Physical Sciences"),
            DisciplineIndicator::new("ENGTECH", "Engineering & Technology"),
            DisciplineIndicator::new("LIFE", "Life Sciences"),
            DisciplineIndicator::new("MED", "Medicine"),
            DisciplineIndicator::new("SOCEC", "Social Sciences & Economics"),
            DisciplineIndicator::new("LAW", "Law"),
            DisciplineIndicator::new("ARTHUM", "Arts & Humanities"),
        ];

        let translations = [
            ("Social Sciences & Economics", "Sciences sociales et économie"),
            ("Life Sciences", "Sciences de la vie"),
            ("Engineering & Technology", "Ingénierie & technologie"),
            ("Medicine", "Médecine"),
            ("Arts & Humanities", "Arts et Lettres"),
            ("Physical Sciences", "Sciences physiques"),
            ("Law", "Droit"),
        ];

        let discipline_categories = [
            ("Sciences sociales et économie", "SHS"),
            ("Sciences de la vie", "STEM"),
            ("Ingénierie & technologie", "STEM"),
            ("Médecine", "Médecine"),
            ("Arts et Lettres", "Arts et Lettres"),
            ("Sciences physiques", "STEM"),
            ("Droit", "Droit"),
        ];

        Self {
            basis: BasisFields::default(),
            disciplines,
            translations: to_map(&translations),
            discipline_categories: to_map(&discipline_categories),
            category_order: ["SHS", "STEM", "Médecine", "Arts et Lettres", "Droit"]
                .into_iter()
                .map(String::from)
                .collect(),
            tool_codes: [
                "WORD", "GTDRIVE", "AUTHOREA", "LATEX", "SCRIVEN", "OVERLEAF", "SCALAR",
                "WRITEOTHCL",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            checkbox_markers: vec!["1".into()],
            free_text_tools: "WRITESPECCL".into(),
            unknown: UNKNOWN.into(),
            other_category: OTHER_CATEGORY.into(),
            others_marker: OTHERS_MARKER.into(),
        }
    }
}

fn to_map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

impl SurveyLayout {
    /// Load a layout from a JSON string and validate it.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let layout: Self = serde_json::from_str(json)?;
        layout.validate()?;
        Ok(layout)
    }

    /// Load a layout from a JSON file and validate it.
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn to_json(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check that codes are unique, every declared discipline has a category
    /// and every mapped category is declared.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.disciplines.is_empty() {
            return Err(ConfigError::InvalidLayout(
                "no discipline indicators declared".into(),
            ));
        }
        if self.category_order.is_empty() {
            return Err(ConfigError::InvalidLayout(
                "discipline category enumeration is empty".into(),
            ));
        }

        let mut seen = HashSet::new();
        let codes = self
            .disciplines
            .iter()
            .map(|d| d.code.as_str())
            .chain(self.tool_codes.iter().map(String::as_str));
        for code in codes {
            if !seen.insert(code) {
                return Err(ConfigError::DuplicateCode(code.to_string()));
            }
        }

        for discipline in self.display_disciplines() {
            if self.category_of(discipline).is_none() {
                return Err(ConfigError::UnmappedDiscipline(discipline.to_string()));
            }
        }

        for (discipline, category) in &self.discipline_categories {
            if !self.category_order.contains(category) {
                return Err(ConfigError::UndeclaredCategory {
                    discipline: discipline.clone(),
                    category: category.clone(),
                });
            }
        }

        Ok(())
    }

    /// Display label of an indicator, translated when a translation exists.
    pub fn display_label<'a>(&'a self, indicator: &'a DisciplineIndicator) -> &'a str {
        self.translations
            .get(&indicator.label)
            .map(String::as_str)
            .unwrap_or(&indicator.label)
    }

    /// Display labels of every declared discipline, in indicator order.
    pub fn display_disciplines(&self) -> Vec<&str> {
        self.disciplines
            .iter()
            .map(|d| self.display_label(d))
            .collect()
    }

    /// Category of a display label, if it has one.
    pub fn category_of(&self, discipline: &str) -> Option<&str> {
        self.discipline_categories
            .get(discipline)
            .map(String::as_str)
    }

    /// Declared disciplines belonging to `category`, derived from the
    /// forward mapping.
    pub fn disciplines_in(&self, category: &str) -> Vec<&str> {
        self.display_disciplines()
            .into_iter()
            .filter(|d| self.category_of(d) == Some(category))
            .collect()
    }

    pub fn is_checkbox_marker(&self, value: &str) -> bool {
        self.checkbox_markers.iter().any(|m| m == value)
    }
}

// =============================================================================
// Run options
// =============================================================================

/// What to do with a respondent who selected no tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EmptyToolsPolicy {
    /// Drop the respondent from every respondent-level table.
    #[default]
    Exclude,
    /// Keep the respondent with the unknown sentinel as its only tool.
    Sentinel,
}

/// Options for one report run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportOptions {
    pub on_empty_tools: EmptyToolsPolicy,

    /// Length of the top-N tables.
    pub top_n: usize,

    /// Tool family dropped from the "no WYSIWYG" tables.
    pub excluded_tool_category: String,

    /// `None` auto-detects.
    pub survey_delimiter: Option<char>,

    /// `None` auto-detects.
    pub reference_delimiter: Option<char>,

    pub output_delimiter: char,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            on_empty_tools: EmptyToolsPolicy::default(),
            top_n: 10,
            excluded_tool_category: DEFAULT_EXCLUDED_TOOL_CATEGORY.into(),
            survey_delimiter: Some(';'),
            reference_delimiter: Some(','),
            output_delimiter: ',',
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout_is_valid() {
        let layout = SurveyLayout::default();
        assert!(layout.validate().is_ok());
        assert_eq!(layout.disciplines.len(), 7);
        assert_eq!(layout.tool_codes.len(), 8);
    }

    #[test]
    fn test_display_label_translates() {
        let layout = SurveyLayout::default();
        let phys = &layout.disciplines[0];
        assert_eq!(layout.display_label(phys), "Sciences physiques");

        let untranslated = DisciplineIndicator::new("X", "Astrology");
        assert_eq!(layout.display_label(&untranslated), "Astrology");
    }

    #[test]
    fn test_reverse_index_derived_from_forward_map() {
        let layout = SurveyLayout::default();
        assert_eq!(
            layout.disciplines_in("STEM"),
            vec!["Sciences physiques", "Ingénierie & technologie", "Sciences de la vie"]
        );
        assert_eq!(layout.disciplines_in("Droit"), vec!["Droit"]);
        assert_eq!(layout.disciplines_in("Arts et Lettres"), vec!["Arts et Lettres"]);
        assert!(layout.disciplines_in("Nope").is_empty());
    }

    #[test]
    fn test_duplicate_code_rejected() {
        let mut layout = SurveyLayout::default();
        layout.tool_codes.push("PHYS".into());
        assert!(matches!(
            layout.validate(),
            Err(ConfigError::DuplicateCode(code)) if code == "PHYS"
        ));
    }

    #[test]
    fn test_undeclared_category_rejected() {
        let mut layout = SurveyLayout::default();
        layout
            .discipline_categories
            .insert("Droit".into(), "LAW".into());
        assert!(matches!(
            layout.validate(),
            Err(ConfigError::UndeclaredCategory { .. })
        ));
    }

    #[test]
    fn test_discipline_without_category_rejected() {
        let mut layout = SurveyLayout::default();
        layout.discipline_categories.remove("Droit");
        assert!(matches!(
            layout.validate(),
            Err(ConfigError::UnmappedDiscipline(label)) if label == "Droit"
        ));
    }

    #[test]
    fn test_misspelled_mapping_in_json_rejected() {
        let json = r#"{
            "disciplines": [{"code": "LAW", "label": "Law"}],
            "translations": {},
            "discipline_categories": {"Lwa": "Droit"},
            "category_order": ["Droit"]
        }"#;
        assert!(matches!(
            SurveyLayout::from_json(json),
            Err(ConfigError::UnmappedDiscipline(label)) if label == "Law"
        ));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let layout = SurveyLayout::from_json(r#"{"tool_codes": ["WORD", "LATEX"]}"#).unwrap();
        assert_eq!(layout.tool_codes, vec!["WORD", "LATEX"]);
        assert_eq!(layout.free_text_tools, "WRITESPECCL");
        assert_eq!(layout.unknown, UNKNOWN);
    }

    #[test]
    fn test_layout_json_roundtrip_keeps_basis_headers() {
        let json = SurveyLayout::default().to_json().unwrap();
        assert!(json.contains("\"last affiliation country\""));
        let back = SurveyLayout::from_json(&json).unwrap();
        assert_eq!(back, SurveyLayout::default());
    }

    #[test]
    fn test_default_options() {
        let opts = ReportOptions::default();
        assert_eq!(opts.on_empty_tools, EmptyToolsPolicy::Exclude);
        assert_eq!(opts.top_n, 10);
        assert_eq!(opts.survey_delimiter, Some(';'));
        assert_eq!(opts.excluded_tool_category, "wysiwyg bureautique");
    }

    #[test]
    fn test_policy_deserializes_lowercase() {
        let opts: ReportOptions = serde_json::from_str(r#"{"on_empty_tools": "sentinel"}"#).unwrap();
        assert_eq!(opts.on_empty_tools, EmptyToolsPolicy::Sentinel);
        assert_eq!(opts.top_n, 10);
    }
}
