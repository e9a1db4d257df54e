//! Error types for the survey report pipeline.
//!
//! One enum per layer:
//!
//! - [`InputError`] - reading and parsing the input tables
//! - [`ConfigError`] - survey layout and run options
//! - [`ReportError`] - rendering and writing output tables
//! - [`PipelineError`] - top-level orchestration
//!
//! Conversion into [`PipelineError`] is automatic via `From`, so `?` works
//! across layer boundaries.

use thiserror::Error;

// =============================================================================
// Input Errors
// =============================================================================

/// Errors while reading an input table.
#[derive(Debug, Error)]
pub enum InputError {
    /// Failed to read file.
    #[error("Failed to read file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Content could not be decoded.
    #[error("Failed to decode content: {0}")]
    Encoding(String),

    /// Invalid delimited format.
    #[error("Invalid CSV at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// Empty file.
    #[error("Input file is empty")]
    EmptyFile,

    /// No headers found.
    #[error("No headers found in input")]
    NoHeaders,

    /// A required column is absent from the header row.
    #[error("Missing column '{0}' in input headers")]
    MissingColumn(String),
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors in the survey layout or run options.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a configuration file.
    #[error("Config IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("Config JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The same indicator code is declared twice.
    #[error("Duplicate indicator code: {0}")]
    DuplicateCode(String),

    /// A declared discipline has no category.
    #[error("Discipline '{0}' has no category")]
    UnmappedDiscipline(String),

    /// A discipline maps to a category that is not in the enumeration.
    #[error("Discipline '{discipline}' maps to undeclared category '{category}'")]
    UndeclaredCategory { discipline: String, category: String },

    /// Anything else that makes the layout unusable.
    #[error("Invalid layout: {0}")]
    InvalidLayout(String),
}

// =============================================================================
// Report Errors
// =============================================================================

/// Errors while rendering or writing an output table.
#[derive(Debug, Error)]
pub enum ReportError {
    /// CSV serialization failed.
    #[error("CSV error in '{table}': {source}")]
    Csv {
        table: String,
        #[source]
        source: csv::Error,
    },

    /// Writer could not be flushed into a buffer.
    #[error("Failed to finish '{0}'")]
    Flush(String),

    /// IO error while writing.
    #[error("Failed to write '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The write task panicked or was cancelled.
    #[error("Write task for '{0}' did not complete")]
    Join(String),

    /// The output delimiter does not fit in one byte.
    #[error("Output delimiter '{0}' is not ASCII")]
    Delimiter(char),
}

impl ReportError {
    /// Table (or file) the error is about. Empty for run-wide errors.
    pub fn table(&self) -> &str {
        match self {
            ReportError::Csv { table, .. } => table,
            ReportError::Flush(table) | ReportError::Join(table) => table,
            ReportError::Io { path, .. } => path,
            ReportError::Delimiter(_) => "",
        }
    }
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline orchestration errors.
///
/// This is the error type returned by [`crate::transform::pipeline::run`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Input reading error.
    #[error("Input error: {0}")]
    Input(#[from] InputError),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Report error.
    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    /// Could not prepare the output directory.
    #[error("Cannot create output directory '{path}': {source}")]
    OutputDir {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The survey table has no data rows.
    #[error("No survey responses to aggregate")]
    EmptyInput,
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for input operations.
pub type InputResult<T> = Result<T, InputError>;

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for report operations.
pub type ReportResult<T> = Result<T, ReportError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        // InputError -> PipelineError
        let input_err = InputError::EmptyFile;
        let pipeline_err: PipelineError = input_err.into();
        assert!(pipeline_err.to_string().contains("empty"));

        // ConfigError -> PipelineError
        let config_err = ConfigError::DuplicateCode("PHYS".into());
        let pipeline_err: PipelineError = config_err.into();
        assert!(pipeline_err.to_string().contains("PHYS"));
    }

    #[test]
    fn test_undeclared_category_format() {
        let err = ConfigError::UndeclaredCategory {
            discipline: "Droit".into(),
            category: "LAW".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Droit"));
        assert!(msg.contains("LAW"));
    }

    #[test]
    fn test_parse_error_mentions_line() {
        let err = InputError::Parse {
            line: 12,
            message: "unequal lengths".into(),
        };
        assert!(err.to_string().contains("line 12"));
    }
}
