//! Fractional weights of a respondent's selections.
//!
//! All functions are total: an empty selection weighs 0.

/// Weights derived from the sizes of a respondent's selections.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weights {
    /// `1 / |disciplines|`
    pub discipline: f64,
    /// `1 / |discipline categories|`
    pub discipline_category: f64,
    /// `1 / (|tools| + |disciplines|)`, carried by each observation row.
    pub observation: f64,
}

impl Weights {
    pub fn compute(tools: usize, disciplines: usize, discipline_categories: usize) -> Self {
        Self {
            discipline: inverse(disciplines),
            discipline_category: inverse(discipline_categories),
            observation: inverse(tools + disciplines),
        }
    }
}

/// `1 / n`, or 0 when `n` is 0.
pub fn inverse(n: usize) -> f64 {
    if n == 0 {
        0.0
    } else {
        1.0 / n as f64
    }
}

/// `numerator / denominator`. A zero denominator yields `NaN` so empty
/// groups stay visible in the reports.
pub fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        f64::NAN
    } else {
        numerator / denominator
    }
}
