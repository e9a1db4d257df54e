//! High-level pipeline: input files in, report files out.
//!
//! # Example
//!
//! ```rust,ignore
//! use survey_report::{run, ReportOptions, RunPaths, SurveyLayout};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let summary = run(
//!         &RunPaths::default(),
//!         &SurveyLayout::default(),
//!         &ReportOptions::default(),
//!     ).await?;
//!
//!     println!("{} respondents, {} tables", summary.respondents, summary.tables_written);
//!     Ok(())
//! }
//! ```

use serde::Serialize;
use std::path::PathBuf;

use crate::config::{ReportOptions, SurveyLayout};
use crate::error::{PipelineError, PipelineResult};
use crate::logs::{log_info, log_info_indent, log_success, log_warning, LogEntry, RunCapture};
use crate::models::RawResponse;
use crate::parser::{parse_file, ParseResult};
use crate::reference::ToolReference;
use crate::report::{emit_all, render_all};

use super::aggregate::Aggregates;
use super::extract::extract_all;

/// Default survey table.
pub const DEFAULT_SURVEY_PATH: &str = "dataset101.csv";

/// Default tool reference table.
pub const DEFAULT_TOOLS_PATH: &str = "tools.csv";

/// Input and output locations of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunPaths {
    pub survey: PathBuf,
    pub tools: PathBuf,
    pub output_dir: PathBuf,
}

impl Default for RunPaths {
    fn default() -> Self {
        Self {
            survey: PathBuf::from(DEFAULT_SURVEY_PATH),
            tools: PathBuf::from(DEFAULT_TOOLS_PATH),
            output_dir: PathBuf::from("."),
        }
    }
}

/// What a run did
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub rows: usize,
    pub respondents: usize,
    pub excluded: usize,
    pub observations: usize,
    /// Summed weight of all observations
    pub total_weight: f64,
    pub tables_written: usize,
    /// Table name and error of each table that failed to render or write
    pub tables_failed: Vec<(String, String)>,
    /// Warnings and errors logged during the run
    pub issues: Vec<LogEntry>,
}

/// Compute every table from rows already in memory. No I/O besides logging.
pub fn analyze(
    rows: &[RawResponse],
    reference: &ToolReference,
    layout: &SurveyLayout,
    options: &ReportOptions,
) -> Aggregates {
    let extraction = extract_all(rows, layout, options.on_empty_tools);
    log_success(format!(
        "{} respondents kept, {} without tools excluded",
        extraction.respondents.len(),
        extraction.excluded.len()
    ));

    let aggregates = Aggregates::compute(extraction, reference, layout, options);
    log_success(format!(
        "{} observations over {} tools, total weight {:.3}",
        aggregates.observations.len(),
        aggregates.tools_seen.len(),
        aggregates.total_observation_weight()
    ));
    aggregates
}

/// Run the whole batch: read both tables, aggregate, write every report.
///
/// Unreadable inputs and invalid layouts abort the run. Table failures do
/// not: they are reported in [`RunSummary::tables_failed`]. Every warning
/// and error logged along the way ends up in [`RunSummary::issues`].
pub async fn run(
    paths: &RunPaths,
    layout: &SurveyLayout,
    options: &ReportOptions,
) -> PipelineResult<RunSummary> {
    let capture = RunCapture::start();
    let mut summary = capture.scope(run_steps(paths, layout, options)).await?;
    summary.issues = capture.finish();
    Ok(summary)
}

async fn run_steps(
    paths: &RunPaths,
    layout: &SurveyLayout,
    options: &ReportOptions,
) -> PipelineResult<RunSummary> {
    layout.validate()?;

    log_info(format!("📖 Reading tool reference: {}", paths.tools.display()));
    let parsed_tools = parse_file(&paths.tools, options.reference_delimiter)?;
    describe(&parsed_tools);
    let reference = ToolReference::from_parsed(&parsed_tools, &layout.other_category)?;
    log_success(format!(
        "{} tools in {} families",
        reference.len(),
        reference.categories().len()
    ));

    log_info(format!("📖 Reading survey: {}", paths.survey.display()));
    let survey = parse_file(&paths.survey, options.survey_delimiter)?;
    describe(&survey);
    if survey.records.is_empty() {
        return Err(PipelineError::EmptyInput);
    }
    check_columns(&survey, layout);

    log_info("⚙️  Aggregating...");
    let aggregates = analyze(&survey.records, &reference, layout, options);

    let rendered = render_all(&aggregates, options)?;

    log_info(format!("💾 Writing reports to {}", paths.output_dir.display()));
    tokio::fs::create_dir_all(&paths.output_dir)
        .await
        .map_err(|source| PipelineError::OutputDir {
            path: paths.output_dir.display().to_string(),
            source,
        })?;
    let mut emitted = emit_all(rendered.reports, &paths.output_dir).await;
    emitted.failed.splice(0..0, rendered.failed);

    if emitted.is_complete() {
        log_success(format!("All {} tables written", emitted.written.len()));
    } else {
        log_warning(format!(
            "{} tables written, {} failed",
            emitted.written.len(),
            emitted.failed.len()
        ));
    }

    Ok(RunSummary {
        rows: survey.records.len(),
        respondents: aggregates.respondents.len(),
        excluded: aggregates.excluded,
        observations: aggregates.observations.len(),
        total_weight: aggregates.total_observation_weight(),
        tables_written: emitted.written.len(),
        tables_failed: emitted.failed,
        issues: Vec::new(),
    })
}

fn describe(parsed: &ParseResult) {
    log_info_indent(
        format!(
            "encoding {}, delimiter '{}', {} columns, {} rows",
            parsed.encoding,
            format_delimiter(parsed.delimiter),
            parsed.headers.len(),
            parsed.records.len()
        ),
        1,
    );
}

/// Warn about layout codes the survey header does not have. Missing fields
/// read as blank, so this is not fatal.
fn check_columns(survey: &ParseResult, layout: &SurveyLayout) {
    let missing: Vec<&str> = layout
        .disciplines
        .iter()
        .map(|d| d.code.as_str())
        .chain(layout.tool_codes.iter().map(String::as_str))
        .chain(std::iter::once(layout.free_text_tools.as_str()))
        .filter(|code| !survey.has_column(code))
        .collect();
    if !missing.is_empty() {
        log_warning(format!("Columns absent from survey: {}", missing.join(", ")));
    }
}

fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmptyToolsPolicy;
    use crate::error::ReportError;
    use crate::logs::LogLevel;
    use crate::report::{BY_RESPONDENT_FILE, POPULARITY_FILE, USAGE_FILE};
    use std::fs;
    use tempfile::tempdir;

    const SURVEY: &str = "\
ID;ROLE;COUNTRYCL;PUBYEAR;PHYS;ENGTECH;LIFE;MED;SOCEC;LAW;ARTHUM;WORD;GTDRIVE;AUTHOREA;LATEX;SCRIVEN;OVERLEAF;SCALAR;WRITEOTHCL;WRITESPECCL
1;Researcher;France;2001;Physical Sciences;;;;;;;Word;;;LaTeX;;;;;
2;Student;Belgium;2015;;;;;;Law;;Word;;;;;;;(and also) others;Zotero, Pandoc
3;Researcher;Canada;1999;;;;Medicine;;;;;;;;;;;;
";

    const TOOLS: &str = "\
tool,famille
Word,wysiwyg bureautique
LaTeX,latex
Pandoc,texte brut
Zotero,
";

    fn write_inputs(dir: &std::path::Path) -> RunPaths {
        let survey = dir.join("survey.csv");
        let tools = dir.join("tools.csv");
        fs::write(&survey, SURVEY).unwrap();
        fs::write(&tools, TOOLS).unwrap();
        RunPaths {
            survey,
            tools,
            output_dir: dir.join("out"),
        }
    }

    #[tokio::test]
    async fn test_run_writes_reports() {
        let dir = tempdir().unwrap();
        let paths = write_inputs(dir.path());

        let summary = run(&paths, &SurveyLayout::default(), &ReportOptions::default())
            .await
            .unwrap();

        assert_eq!(summary.rows, 3);
        assert_eq!(summary.respondents, 2);
        assert_eq!(summary.excluded, 1);
        // 2 tools x 1 discipline + 3 tools x 1 discipline
        assert_eq!(summary.observations, 5);
        // 2 * 1/3 + 3 * 1/4
        assert!((summary.total_weight - (2.0 / 3.0 + 0.75)).abs() < 1e-9);
        assert!(summary.tables_failed.is_empty());
        // 14 fixed tables + 7 per-discipline tables
        assert_eq!(summary.tables_written, 21);

        let by_respondent = fs::read_to_string(paths.output_dir.join(BY_RESPONDENT_FILE)).unwrap();
        assert!(by_respondent.contains("Zotero | Pandoc | Word"));

        let usage = fs::read_to_string(paths.output_dir.join(USAGE_FILE)).unwrap();
        assert!(usage.starts_with("tool,cat,compte"));

        let tools = fs::read_to_string(paths.output_dir.join("tools.txt")).unwrap();
        assert_eq!(tools, "Word\nLaTeX\nZotero\nPandoc");

        assert!(paths
            .output_dir
            .join("output_weightened_Sciences physiques.csv")
            .exists());
    }

    #[tokio::test]
    async fn test_run_sentinel_policy_keeps_everyone() {
        let dir = tempdir().unwrap();
        let paths = write_inputs(dir.path());
        let options = ReportOptions {
            on_empty_tools: EmptyToolsPolicy::Sentinel,
            ..ReportOptions::default()
        };

        let summary = run(&paths, &SurveyLayout::default(), &options).await.unwrap();

        assert_eq!(summary.respondents, 3);
        assert_eq!(summary.excluded, 0);
        let popularity = fs::read_to_string(paths.output_dir.join(POPULARITY_FILE)).unwrap();
        assert!(popularity.contains("unknown"));
    }

    #[tokio::test]
    async fn test_run_reports_absent_columns_as_issues() {
        let dir = tempdir().unwrap();
        let paths = write_inputs(dir.path());
        fs::write(
            &paths.survey,
            "ID;ROLE;COUNTRYCL;PUBYEAR;PHYS;WORD\n1;Researcher;France;2001;1;Word\n",
        )
        .unwrap();

        let summary = run(&paths, &SurveyLayout::default(), &ReportOptions::default())
            .await
            .unwrap();

        let absent = summary
            .issues
            .iter()
            .find(|e| e.message.starts_with("Columns absent from survey"))
            .unwrap();
        assert_eq!(absent.level, LogLevel::Warning);
        assert!(absent.message.contains("SCALAR"));
        assert!(absent.message.contains("WRITESPECCL"));
        // per-discipline tables of unselected disciplines are empty
        assert!(summary
            .issues
            .iter()
            .any(|e| e.message == "observations for Droit: no rows"));
    }

    #[tokio::test]
    async fn test_run_rejects_non_ascii_output_delimiter() {
        let dir = tempdir().unwrap();
        let paths = write_inputs(dir.path());
        let options = ReportOptions {
            output_delimiter: '§',
            ..ReportOptions::default()
        };

        let err = run(&paths, &SurveyLayout::default(), &options).await.unwrap_err();
        assert!(matches!(err, PipelineError::Report(ReportError::Delimiter('§'))));
        assert!(!paths.output_dir.exists());
    }

    #[tokio::test]
    async fn test_run_missing_input_fails() {
        let dir = tempdir().unwrap();
        let paths = RunPaths {
            survey: dir.path().join("nope.csv"),
            tools: dir.path().join("nope-tools.csv"),
            output_dir: dir.path().join("out"),
        };

        let err = run(&paths, &SurveyLayout::default(), &ReportOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Input(_)));
    }

    #[tokio::test]
    async fn test_run_header_only_survey_is_empty_input() {
        let dir = tempdir().unwrap();
        let paths = write_inputs(dir.path());
        fs::write(&paths.survey, "ID;PHYS;WORD\n").unwrap();

        let err = run(&paths, &SurveyLayout::default(), &ReportOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::EmptyInput));
    }

    #[tokio::test]
    async fn test_run_rejects_invalid_layout() {
        let dir = tempdir().unwrap();
        let paths = write_inputs(dir.path());
        let mut layout = SurveyLayout::default();
        layout.category_order.clear();

        let err = run(&paths, &layout, &ReportOptions::default()).await.unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn test_default_paths() {
        let paths = RunPaths::default();
        assert_eq!(paths.survey, PathBuf::from("dataset101.csv"));
        assert_eq!(paths.tools, PathBuf::from("tools.csv"));
    }
}
