//! Survey row -> respondent record.
//!
//! ```text
//! RawResponse ──▶ basis        (concatenated sub-fields)
//!             ──▶ disciplines  (ticked indicators, translated, or "unknown")
//!             ──▶ tools        (free text + indicators, minus the catch-all)
//!             ──▶ weights
//! ```

use crate::config::{EmptyToolsPolicy, SurveyLayout};
use crate::models::{Basis, RawResponse, Respondent};

use super::weights::Weights;

/// Respondents extracted from a whole survey table.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Respondents taking part in the aggregates.
    pub respondents: Vec<Respondent>,
    /// Identity of rows dropped for lack of any tool.
    pub excluded: Vec<Basis>,
    /// Every tool of a kept respondent, first-seen order.
    pub tools_seen: Vec<String>,
}

/// Extract every row.
pub fn extract_all(
    rows: &[RawResponse],
    layout: &SurveyLayout,
    policy: EmptyToolsPolicy,
) -> Extraction {
    rows.iter().fold(Extraction::default(), |mut acc, row| {
        match extract_respondent(row, layout, policy) {
            Some(respondent) => {
                for tool in &respondent.tools {
                    push_unique(&mut acc.tools_seen, tool);
                }
                acc.respondents.push(respondent);
            }
            None => acc.excluded.push(build_basis(row, layout)),
        }
        acc
    })
}

/// Extract one row. `None` when the row has no tool and `policy` excludes it.
pub fn extract_respondent(
    row: &RawResponse,
    layout: &SurveyLayout,
    policy: EmptyToolsPolicy,
) -> Option<Respondent> {
    let mut tools = collect_tools(row, layout);
    if tools.is_empty() {
        match policy {
            EmptyToolsPolicy::Exclude => return None,
            EmptyToolsPolicy::Sentinel => tools.push(layout.unknown.clone()),
        }
    }

    let disciplines = collect_disciplines(row, layout);
    let discipline_categories = categories_of(&disciplines, layout);
    let weights = Weights::compute(tools.len(), disciplines.len(), discipline_categories.len());

    Some(Respondent {
        basis: build_basis(row, layout),
        disciplines,
        discipline_categories,
        tools,
        discipline_weight: weights.discipline,
        discipline_category_weight: weights.discipline_category,
    })
}

/// Concatenate each basis key's sub-fields, no separator.
pub fn build_basis(row: &RawResponse, layout: &SurveyLayout) -> Basis {
    let join = |codes: &[String]| codes.iter().map(|c| row.get(c)).collect::<String>();
    Basis {
        id: join(&layout.basis.id),
        role: join(&layout.basis.role),
        last_affiliation_country: join(&layout.basis.last_affiliation_country),
        first_publication_year: join(&layout.basis.first_publication_year),
    }
}

/// Display labels of ticked discipline indicators, or the unknown sentinel.
pub fn collect_disciplines(row: &RawResponse, layout: &SurveyLayout) -> Vec<String> {
    let mut disciplines = Vec::new();
    for indicator in &layout.disciplines {
        if row.is_filled(&indicator.code) {
            push_unique(&mut disciplines, layout.display_label(indicator));
        }
    }
    if disciplines.is_empty() {
        disciplines.push(layout.unknown.clone());
    }
    disciplines
}

/// Free-text tools, then indicator tools, without the catch-all answer.
pub fn collect_tools(row: &RawResponse, layout: &SurveyLayout) -> Vec<String> {
    let free_text = row
        .get(&layout.free_text_tools)
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let indicated = layout.tool_codes.iter().filter_map(|code| {
        let value = row.get(code).trim();
        if value.is_empty() {
            None
        } else if layout.is_checkbox_marker(value) {
            Some(code.as_str())
        } else {
            Some(value)
        }
    });

    let mut tools = Vec::new();
    for tool in free_text.chain(indicated) {
        if tool != layout.others_marker {
            push_unique(&mut tools, tool);
        }
    }
    tools
}

/// Categories reached by `disciplines`, in enumeration order.
fn categories_of(disciplines: &[String], layout: &SurveyLayout) -> Vec<String> {
    layout
        .category_order
        .iter()
        .filter(|category| {
            disciplines
                .iter()
                .any(|d| layout.category_of(d) == Some(category.as_str()))
        })
        .cloned()
        .collect()
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !list.iter().any(|v| v == value) {
        list.push(value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> SurveyLayout {
        SurveyLayout::default()
    }

    #[test]
    fn test_single_discipline_single_tool() {
        let row = RawResponse::from_pairs([("ID", "42"), ("PHYS", "1"), ("WORD", "1")]);
        let r = extract_respondent(&row, &layout(), EmptyToolsPolicy::Exclude).unwrap();

        assert_eq!(r.disciplines, vec!["Sciences physiques"]);
        assert_eq!(r.tools, vec!["WORD"]);
        assert_eq!(r.discipline_categories, vec!["STEM"]);
        assert_eq!(r.discipline_weight, 1.0);
        assert_eq!(r.discipline_category_weight, 1.0);
        assert_eq!(r.basis.id, "42");
    }

    #[test]
    fn test_indicator_value_names_the_tool() {
        let row = RawResponse::from_pairs([("WORD", " MS Word "), ("LATEX", "LaTeX")]);
        assert_eq!(collect_tools(&row, &layout()), vec!["MS Word", "LaTeX"]);
    }

    #[test]
    fn test_free_text_tools_come_first_and_are_trimmed() {
        let row = RawResponse::from_pairs([
            ("WRITESPECCL", " Zotero , ,Pandoc,"),
            ("OVERLEAF", "Overleaf"),
        ]);
        assert_eq!(
            collect_tools(&row, &layout()),
            vec!["Zotero", "Pandoc", "Overleaf"]
        );
    }

    #[test]
    fn test_catch_all_answer_removed() {
        let row = RawResponse::from_pairs([
            ("WRITEOTHCL", "(and also) others"),
            ("SCRIVEN", "Scrivener"),
        ]);
        assert_eq!(collect_tools(&row, &layout()), vec!["Scrivener"]);
    }

    #[test]
    fn test_duplicate_tools_collapse() {
        let row = RawResponse::from_pairs([("WRITESPECCL", "Word"), ("WORD", "Word")]);
        assert_eq!(collect_tools(&row, &layout()), vec!["Word"]);
    }

    #[test]
    fn test_no_discipline_falls_back_to_unknown() {
        let row = RawResponse::from_pairs([("WORD", "Word")]);
        let r = extract_respondent(&row, &layout(), EmptyToolsPolicy::Exclude).unwrap();

        assert_eq!(r.disciplines, vec!["unknown"]);
        assert!(r.discipline_categories.is_empty());
        assert_eq!(r.discipline_weight, 1.0);
        assert_eq!(r.discipline_category_weight, 0.0);
    }

    #[test]
    fn test_empty_tools_excluded() {
        let row = RawResponse::from_pairs([("ID", "7")]);
        assert!(extract_respondent(&row, &layout(), EmptyToolsPolicy::Exclude).is_none());
    }

    #[test]
    fn test_empty_tools_sentinel() {
        let row = RawResponse::from_pairs([("ID", "7"), ("LAW", "Law")]);
        let r = extract_respondent(&row, &layout(), EmptyToolsPolicy::Sentinel).unwrap();
        assert_eq!(r.tools, vec!["unknown"]);
        assert_eq!(r.disciplines, vec!["Droit"]);
    }

    #[test]
    fn test_multi_membership_weights() {
        let row = RawResponse::from_pairs([
            ("PHYS", "1"),
            ("LIFE", "1"),
            ("LAW", "1"),
            ("LATEX", "LaTeX"),
        ]);
        let r = extract_respondent(&row, &layout(), EmptyToolsPolicy::Exclude).unwrap();

        assert_eq!(r.disciplines.len(), 3);
        assert_eq!(r.discipline_categories, vec!["STEM", "Droit"]);
        assert!((r.discipline_weight * 3.0 - 1.0).abs() < 1e-12);
        assert!((r.discipline_category_weight * 2.0 - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_basis_concatenates_sub_fields() {
        let mut layout = layout();
        layout.basis.role = vec!["ROLE".into(), "ROLEOTH".into()];
        let row = RawResponse::from_pairs([("ROLE", "Researcher"), ("ROLEOTH", "/PhD")]);
        assert_eq!(build_basis(&row, &layout).role, "Researcher/PhD");
    }

    #[test]
    fn test_extract_all_splits_kept_and_excluded() {
        let rows = vec![
            RawResponse::from_pairs([("ID", "1"), ("WORD", "Word")]),
            RawResponse::from_pairs([("ID", "2")]),
            RawResponse::from_pairs([("ID", "3"), ("LATEX", "LaTeX"), ("WORD", "Word")]),
        ];
        let extraction = extract_all(&rows, &layout(), EmptyToolsPolicy::Exclude);

        assert_eq!(extraction.respondents.len(), 2);
        assert_eq!(extraction.excluded.len(), 1);
        assert_eq!(extraction.excluded[0].id, "2");
        assert_eq!(extraction.tools_seen, vec!["Word", "LaTeX"]);
    }

    #[test]
    fn test_extract_all_sentinel_keeps_everyone() {
        let rows = vec![
            RawResponse::from_pairs([("ID", "1")]),
            RawResponse::from_pairs([("ID", "2"), ("WORD", "Word")]),
        ];
        let extraction = extract_all(&rows, &layout(), EmptyToolsPolicy::Sentinel);

        assert_eq!(extraction.respondents.len(), 2);
        assert!(extraction.excluded.is_empty());
        assert_eq!(extraction.tools_seen, vec!["unknown", "Word"]);
    }
}
