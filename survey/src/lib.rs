//! # Survey Report - weighted writing-tool usage from survey responses
//!
//! Survey Report reads a multi-response survey (one row per respondent,
//! disciplines and writing tools as indicator columns) plus a tool reference
//! table, and produces weighted summary tables of tool usage per discipline
//! and discipline category.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ Survey CSV  │────▶│   Parser    │────▶│  Extract +  │────▶│   Report    │
//! │ + tools.csv │     │  (auto-enc) │     │  Aggregate  │     │  (CSV, txt) │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use survey_report::{run, ReportOptions, RunPaths, SurveyLayout};
//!
//! #[tokio::main]
//! async fn main() {
//!     let summary = run(&RunPaths::default(), &SurveyLayout::default(), &ReportOptions::default())
//!         .await
//!         .unwrap();
//!     println!("Aggregated {} respondents", summary.respondents);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error types per layer
//! - [`logs`] - Log broadcasting
//! - [`models`] - Survey rows, respondents, observations
//! - [`config`] - Survey layout and run options
//! - [`parser`] - Delimited-text parsing with auto-detection
//! - [`reference`] - Tool to tool-family reference
//! - [`transform`] - Extraction, weights, aggregates, pipeline
//! - [`report`] - Table rendering and writing

// Core modules
pub mod error;
pub mod logs;
pub mod models;

// Configuration
pub mod config;

// Parsing
pub mod parser;
pub mod reference;

// Transformation
pub mod transform;

// Output
pub mod report;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ConfigError, ConfigResult, InputError, InputResult, PipelineError, PipelineResult,
    ReportError, ReportResult,
};

// =============================================================================
// Re-exports - Logging
// =============================================================================

pub use logs::{LogBroadcaster, LogEntry, LogLevel, RunCapture, LOG_BROADCASTER};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{Basis, ObservationRow, RawResponse, ReferenceEntry, Respondent};

// =============================================================================
// Re-exports - Configuration
// =============================================================================

pub use config::{
    BasisFields, DisciplineIndicator, EmptyToolsPolicy, ReportOptions, SurveyLayout,
};

// =============================================================================
// Re-exports - Parsing
// =============================================================================

pub use parser::{
    decode_content, detect_delimiter, detect_encoding, parse_bytes, parse_file, parse_str,
    ParseResult,
};
pub use reference::ToolReference;

// =============================================================================
// Re-exports - Transformation
// =============================================================================

pub use transform::{
    analyze, extract_all, extract_respondent, ratio, run, Aggregates, Extraction, RunPaths,
    RunSummary, Weights,
};

// =============================================================================
// Re-exports - Reports
// =============================================================================

pub use report::{emit, emit_all, render_all, EmitSummary, Rendered, Report};
