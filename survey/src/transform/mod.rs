//! Transformation module.
//!
//! This module turns survey rows into report tables:
//! - Weights: fractional weights of a respondent's selections
//! - Extract: survey row to respondent record
//! - Aggregate: observations and every summary table
//! - Pipeline: end-to-end run over files

pub mod aggregate;
pub mod extract;
pub mod pipeline;
pub mod weights;

pub use aggregate::Aggregates;
pub use extract::{extract_all, extract_respondent, Extraction};
pub use pipeline::*;
pub use weights::{ratio, Weights};
