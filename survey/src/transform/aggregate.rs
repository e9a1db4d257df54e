//! Roll-ups of weighted respondents into report tables.
//!
//! Every table is a pure function of the respondent set, the reference
//! lookups and the layout. Running sums live in explicit [`Tally`]
//! accumulators; nothing is shared between tables.
//!
//! Zero denominators are not special-cased: the affected fractions are
//! `NaN` (see [`ratio`]).

use serde::Serialize;
use std::collections::HashMap;
use std::hash::Hash;

use crate::config::{ReportOptions, SurveyLayout};
use crate::models::{ObservationRow, Respondent};
use crate::reference::ToolReference;

use super::extract::Extraction;
use super::weights::{ratio, Weights};

// =============================================================================
// Accumulator
// =============================================================================

/// Insertion-ordered running sums.
#[derive(Debug, Clone)]
pub struct Tally<K> {
    order: Vec<K>,
    sums: HashMap<K, f64>,
}

impl<K: Eq + Hash + Clone> Tally<K> {
    pub fn new() -> Self {
        Self {
            order: Vec::new(),
            sums: HashMap::new(),
        }
    }

    pub fn add(&mut self, key: K, amount: f64) {
        match self.sums.get_mut(&key) {
            Some(sum) => *sum += amount,
            None => {
                self.order.push(key.clone());
                self.sums.insert(key, amount);
            }
        }
    }

    /// Sum for `key`, 0 if never added.
    pub fn get(&self, key: &K) -> f64 {
        self.sums.get(key).copied().unwrap_or(0.0)
    }

    pub fn total(&self) -> f64 {
        self.sums.values().sum()
    }

    /// Keys with their sums, first-added order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, f64)> + '_ {
        self.order.iter().map(move |k| (k, self.get(k)))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl<K: Eq + Hash + Clone> Default for Tally<K> {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Output rows
// =============================================================================

/// Respondents selecting a tool.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ToolPopularity {
    pub tool: String,
    pub respondents: usize,
    pub fraction: f64,
}

/// Respondent selections summed per tool family.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategoryPopularity {
    #[serde(rename = "famille d'outil")]
    pub category: String,
    pub respondents: usize,
    pub fraction: f64,
}

/// Discipline-weighted share of a discipline's respondents using a tool.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ToolDisciplineShare {
    pub tool: String,
    pub discipline: String,
    pub weight: f64,
    #[serde(rename = "discipline_weight")]
    pub discipline_total: f64,
    pub fraction: f64,
}

/// Category-weighted share of a discipline category using a tool family.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategoryCrossShare {
    #[serde(rename = "famille d'outil")]
    pub tool_category: String,
    pub discipline_cat: String,
    pub weight: f64,
    pub respondents: usize,
    pub fraction: f64,
}

/// Weighted respondent mass of a discipline category.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DisciplineCategoryShare {
    pub discipline_cat: String,
    pub weight: f64,
    pub fraction: f64,
    pub percentage: f64,
}

/// Tool-family distribution within a discipline category.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizedShare {
    pub discipline_cat: String,
    pub tool_cat: String,
    pub weight: f64,
    /// Same share with the excluded family removed from the denominator.
    /// `NaN` on the excluded family's own row.
    pub weight_no_wysiwyg: f64,
}

/// Summed observation weight of a tool.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ToolUsage {
    pub tool: String,
    pub cat: String,
    pub compte: f64,
}

// =============================================================================
// Expansion
// =============================================================================

/// One observation per (tool, discipline) of every respondent.
pub fn expand_observations(
    respondents: &[Respondent],
    reference: &ToolReference,
    layout: &SurveyLayout,
) -> Vec<ObservationRow> {
    let mut rows = Vec::new();
    for respondent in respondents {
        let weight = Weights::compute(
            respondent.tools.len(),
            respondent.disciplines.len(),
            respondent.discipline_categories.len(),
        )
        .observation;

        for tool in &respondent.tools {
            let tool_category = reference.category_of(tool);
            for discipline in &respondent.disciplines {
                rows.push(ObservationRow {
                    basis: respondent.basis.clone(),
                    tool: tool.clone(),
                    tool_category: tool_category.to_string(),
                    discipline: discipline.clone(),
                    discipline_category: layout.category_of(discipline).map(String::from),
                    weight,
                });
            }
        }
    }
    rows
}

/// Reference families, then "other" when some tool falls outside them.
pub fn tool_category_axis<'a, I>(reference: &ToolReference, tools: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut axis = reference.categories().to_vec();
    let other = reference.other_category();
    let other_used = tools.into_iter().any(|t| reference.category_of(t) == other);
    if other_used && !axis.iter().any(|c| c == other) {
        axis.push(other.to_string());
    }
    axis
}

fn by_value_desc(a: f64, b: f64, name_a: &str, name_b: &str) -> std::cmp::Ordering {
    b.total_cmp(&a).then_with(|| name_a.cmp(name_b))
}

// =============================================================================
// Popularity
// =============================================================================

/// Respondent count per tool, most used first (ties by name).
pub fn tool_popularity(respondents: &[Respondent]) -> Vec<ToolPopularity> {
    let counts = respondents.iter().fold(Tally::new(), |mut tally, r| {
        for tool in &r.tools {
            tally.add(tool.as_str(), 1.0);
        }
        tally
    });

    let total = respondents.len() as f64;
    let mut rows: Vec<ToolPopularity> = counts
        .iter()
        .map(|(tool, count)| ToolPopularity {
            tool: tool.to_string(),
            respondents: count as usize,
            fraction: ratio(count, total),
        })
        .collect();
    rows.sort_by(|a, b| {
        by_value_desc(a.respondents as f64, b.respondents as f64, &a.tool, &b.tool)
    });
    rows
}

/// First `n` rows, skipping the unknown sentinel.
pub fn top_tools(popularity: &[ToolPopularity], n: usize, unknown: &str) -> Vec<ToolPopularity> {
    popularity
        .iter()
        .filter(|row| row.tool != unknown)
        .take(n)
        .cloned()
        .collect()
}

/// Tool counts summed per family, as a share of all selections.
pub fn tool_category_popularity(
    popularity: &[ToolPopularity],
    reference: &ToolReference,
    axis: &[String],
) -> Vec<CategoryPopularity> {
    let sums = popularity.iter().fold(Tally::new(), |mut tally, row| {
        tally.add(reference.category_of(&row.tool), row.respondents as f64);
        tally
    });

    let grand_total: f64 = axis.iter().map(|c| sums.get(&c.as_str())).sum();
    axis.iter()
        .map(|category| {
            let count = sums.get(&category.as_str());
            CategoryPopularity {
                category: category.clone(),
                respondents: count as usize,
                fraction: ratio(count, grand_total),
            }
        })
        .collect()
}

/// Disciplines in report order: declared ones, then the unknown sentinel
/// when some respondent carries it.
pub fn discipline_axis(respondents: &[Respondent], layout: &SurveyLayout) -> Vec<String> {
    let mut axis: Vec<String> = layout
        .display_disciplines()
        .into_iter()
        .map(String::from)
        .collect();
    if respondents.iter().any(|r| r.has_discipline(&layout.unknown))
        && !axis.contains(&layout.unknown)
    {
        axis.push(layout.unknown.clone());
    }
    axis
}

/// For every (discipline, tool): summed discipline weight of the
/// discipline's respondents using the tool, over the discipline's summed
/// discipline weight.
pub fn tool_popularity_by_discipline(
    respondents: &[Respondent],
    layout: &SurveyLayout,
    tools: &[String],
) -> Vec<ToolDisciplineShare> {
    let mut totals: Tally<&str> = Tally::new();
    let mut pairs: Tally<(&str, &str)> = Tally::new();

    for r in respondents {
        for discipline in &r.disciplines {
            totals.add(discipline.as_str(), r.discipline_weight);
            for tool in &r.tools {
                pairs.add((discipline.as_str(), tool.as_str()), r.discipline_weight);
            }
        }
    }

    let mut rows = Vec::new();
    for discipline in discipline_axis(respondents, layout) {
        let discipline_total = totals.get(&discipline.as_str());
        for tool in tools {
            let weight = pairs.get(&(discipline.as_str(), tool.as_str()));
            rows.push(ToolDisciplineShare {
                tool: tool.clone(),
                discipline: discipline.clone(),
                weight,
                discipline_total,
                fraction: ratio(weight, discipline_total),
            });
        }
    }
    rows
}

/// For every (discipline category, tool family): summed category weight of
/// the category's respondents using at least one tool of the family, over
/// the category's respondent count.
pub fn tool_category_by_discipline_category(
    respondents: &[Respondent],
    reference: &ToolReference,
    layout: &SurveyLayout,
    axis: &[String],
) -> Vec<CategoryCrossShare> {
    let mut members: Tally<&str> = Tally::new();
    let mut pairs: Tally<(&str, &str)> = Tally::new();

    for r in respondents {
        let mut families: Vec<&str> = Vec::new();
        for tool in &r.tools {
            let family = reference.category_of(tool);
            if !families.contains(&family) {
                families.push(family);
            }
        }
        for discipline_cat in &r.discipline_categories {
            members.add(discipline_cat.as_str(), 1.0);
            for &family in &families {
                pairs.add((discipline_cat.as_str(), family), r.discipline_category_weight);
            }
        }
    }

    let mut rows = Vec::new();
    for discipline_cat in &layout.category_order {
        let count = members.get(&discipline_cat.as_str());
        for family in axis {
            let weight = pairs.get(&(discipline_cat.as_str(), family.as_str()));
            rows.push(CategoryCrossShare {
                tool_category: family.clone(),
                discipline_cat: discipline_cat.clone(),
                weight,
                respondents: count as usize,
                fraction: ratio(weight, count),
            });
        }
    }
    rows
}

/// Summed category weight per discipline category, as a share of the whole
/// enumeration.
pub fn respondents_by_discipline_category(
    respondents: &[Respondent],
    layout: &SurveyLayout,
) -> Vec<DisciplineCategoryShare> {
    let sums = respondents.iter().fold(Tally::new(), |mut tally, r| {
        for discipline_cat in &r.discipline_categories {
            tally.add(discipline_cat.as_str(), r.discipline_category_weight);
        }
        tally
    });

    let grand_total: f64 = layout
        .category_order
        .iter()
        .map(|c| sums.get(&c.as_str()))
        .sum();

    layout
        .category_order
        .iter()
        .map(|discipline_cat| {
            let weight = sums.get(&discipline_cat.as_str());
            let fraction = ratio(weight, grand_total);
            DisciplineCategoryShare {
                discipline_cat: discipline_cat.clone(),
                weight,
                fraction,
                percentage: fraction * 100.0,
            }
        })
        .collect()
}

// =============================================================================
// Observation roll-ups
// =============================================================================

/// Per discipline category, the distribution of observation weight over
/// tool families.
pub fn normalized_by_discipline_category(
    observations: &[ObservationRow],
    layout: &SurveyLayout,
    axis: &[String],
    excluded_category: &str,
) -> Vec<NormalizedShare> {
    let sums = observations.iter().fold(Tally::new(), |mut tally, obs| {
        if let Some(discipline_cat) = obs.discipline_category.as_deref() {
            tally.add((discipline_cat, obs.tool_category.as_str()), obs.weight);
        }
        tally
    });

    let mut rows = Vec::new();
    for discipline_cat in &layout.category_order {
        let values: Vec<(&String, f64)> = axis
            .iter()
            .map(|family| (family, sums.get(&(discipline_cat.as_str(), family.as_str()))))
            .collect();
        let sum: f64 = values.iter().map(|(_, v)| v).sum();
        let sum_kept: f64 = values
            .iter()
            .filter(|(family, _)| family.as_str() != excluded_category)
            .map(|(_, v)| v)
            .sum();

        for (family, value) in values {
            let weight_no_wysiwyg = if family == excluded_category {
                f64::NAN
            } else {
                ratio(value, sum_kept)
            };
            rows.push(NormalizedShare {
                discipline_cat: discipline_cat.clone(),
                tool_cat: family.clone(),
                weight: ratio(value, sum),
                weight_no_wysiwyg,
            });
        }
    }
    rows
}

/// Summed observation weight per tool, heaviest first (ties by name).
pub fn tool_usage(observations: &[ObservationRow]) -> Vec<ToolUsage> {
    let mut families: HashMap<&str, &str> = HashMap::new();
    let sums = observations.iter().fold(Tally::new(), |mut tally, obs| {
        families
            .entry(obs.tool.as_str())
            .or_insert(obs.tool_category.as_str());
        tally.add(obs.tool.as_str(), obs.weight);
        tally
    });

    let mut rows: Vec<ToolUsage> = sums
        .iter()
        .map(|(tool, compte)| ToolUsage {
            tool: tool.to_string(),
            cat: families.get(tool).copied().unwrap_or_default().to_string(),
            compte,
        })
        .collect();
    rows.sort_by(|a, b| by_value_desc(a.compte, b.compte, &a.tool, &b.tool));
    rows
}

/// First `n` usage rows, skipping the unknown sentinel.
pub fn top_usage(usage: &[ToolUsage], n: usize, unknown: &str) -> Vec<ToolUsage> {
    usage
        .iter()
        .filter(|row| row.tool != unknown)
        .take(n)
        .cloned()
        .collect()
}

/// Observations with a known discipline category and a tool family that is
/// neither the excluded one, "other", nor blank.
pub fn observations_without_category(
    observations: &[ObservationRow],
    excluded_category: &str,
    other_category: &str,
) -> Vec<ObservationRow> {
    observations
        .iter()
        .filter(|obs| {
            let family = obs.tool_category.trim();
            !family.is_empty() && family != excluded_category && family != other_category
        })
        .filter(|obs| {
            obs.discipline_category
                .as_deref()
                .is_some_and(|c| !c.trim().is_empty())
        })
        .cloned()
        .collect()
}

/// Observations split per declared discipline, declaration order. Disciplines
/// nobody selected get an empty list.
pub fn observations_by_discipline(
    observations: &[ObservationRow],
    layout: &SurveyLayout,
) -> Vec<(String, Vec<ObservationRow>)> {
    layout
        .display_disciplines()
        .into_iter()
        .map(|discipline| {
            let rows = observations
                .iter()
                .filter(|obs| obs.discipline == discipline)
                .cloned()
                .collect();
            (discipline.to_string(), rows)
        })
        .collect()
}

// =============================================================================
// All tables
// =============================================================================

/// Every table of a run.
#[derive(Debug, Clone)]
pub struct Aggregates {
    pub respondents: Vec<Respondent>,
    pub excluded: usize,
    pub tools_seen: Vec<String>,
    pub observations: Vec<ObservationRow>,
    pub observations_no_wysiwyg: Vec<ObservationRow>,
    pub observations_by_discipline: Vec<(String, Vec<ObservationRow>)>,
    pub popularity: Vec<ToolPopularity>,
    pub popularity_top: Vec<ToolPopularity>,
    pub category_popularity: Vec<CategoryPopularity>,
    pub popularity_by_discipline: Vec<ToolDisciplineShare>,
    pub categories_by_discipline_cat: Vec<CategoryCrossShare>,
    pub respondents_by_discipline_cat: Vec<DisciplineCategoryShare>,
    pub normalized: Vec<NormalizedShare>,
    pub normalized_no_wysiwyg: Vec<NormalizedShare>,
    pub usage: Vec<ToolUsage>,
    pub usage_top: Vec<ToolUsage>,
}

impl Aggregates {
    pub fn compute(
        extraction: Extraction,
        reference: &ToolReference,
        layout: &SurveyLayout,
        options: &ReportOptions,
    ) -> Self {
        let Extraction {
            respondents,
            excluded,
            tools_seen,
        } = extraction;

        let observations = expand_observations(&respondents, reference, layout);
        let axis = tool_category_axis(reference, tools_seen.iter().map(String::as_str));
        let excluded_category = options.excluded_tool_category.as_str();

        let popularity = tool_popularity(&respondents);
        let popularity_top = top_tools(&popularity, options.top_n, &layout.unknown);
        let category_popularity = tool_category_popularity(&popularity, reference, &axis);
        let ranked_tools: Vec<String> = popularity.iter().map(|p| p.tool.clone()).collect();
        let popularity_by_discipline =
            tool_popularity_by_discipline(&respondents, layout, &ranked_tools);
        let categories_by_discipline_cat =
            tool_category_by_discipline_category(&respondents, reference, layout, &axis);
        let respondents_by_discipline_cat = respondents_by_discipline_category(&respondents, layout);

        let normalized =
            normalized_by_discipline_category(&observations, layout, &axis, excluded_category);
        let normalized_no_wysiwyg = normalized
            .iter()
            .filter(|row| row.tool_cat != excluded_category)
            .cloned()
            .collect();

        let usage = tool_usage(&observations);
        let usage_top = top_usage(&usage, options.top_n, &layout.unknown);

        let observations_no_wysiwyg =
            observations_without_category(&observations, excluded_category, reference.other_category());
        let observations_by_discipline = observations_by_discipline(&observations, layout);

        Self {
            respondents,
            excluded: excluded.len(),
            tools_seen,
            observations,
            observations_no_wysiwyg,
            observations_by_discipline,
            popularity,
            popularity_top,
            category_popularity,
            popularity_by_discipline,
            categories_by_discipline_cat,
            respondents_by_discipline_cat,
            normalized,
            normalized_no_wysiwyg,
            usage,
            usage_top,
        }
    }

    pub fn total_observation_weight(&self) -> f64 {
        self.observations.iter().map(|o| o.weight).sum()
    }
}
