//! Rendering and writing of the report tables.
//!
//! Tables are rendered to memory first ([`render_all`]), then written
//! concurrently ([`emit_all`]). Each table is independent: a table that fails
//! to render or to write is logged and listed, the others still land on disk.
//! Every table starts with its header line, even when it has no rows.
//!
//! # Output files
//!
//! | Table                                   | File                                                   |
//! |-----------------------------------------|--------------------------------------------------------|
//! | Per-respondent summary                  | `output_by_respondant.csv`                             |
//! | Tool list                               | `tools.txt`                                            |
//! | Weighted observations                   | `output_weightened.csv`                                |
//! | Observations without WYSIWYG/other      | `output_weightened_no_wysiwyg.csv`                     |
//! | Observations of one discipline          | `output_weightened_<discipline>.csv`                   |
//! | Tool families per discipline category   | `output_weightened_normalized_by_discipline_cat.csv`   |
//! | ... without WYSIWYG                     | `output_weightened_normalized_by_discipline_cat_no_wysiwyg.csv` |
//! | Weighted tool usage                     | `tools_use.csv`, `tools_use_10.csv`                    |
//! | Tool popularity                         | `tools_popularity.csv`, `tools_popularity_top.csv`     |
//! | Tool family popularity                  | `tool_categories_popularity.csv`                       |
//! | Tool popularity by discipline           | `tools_popularity_by_discipline.csv`                   |
//! | Tool families by discipline category    | `tool_categories_by_discipline_cat.csv`                |
//! | Respondents by discipline category      | `respondents_by_discipline_cat.csv`                    |

use futures::future::join_all;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::config::ReportOptions;
use crate::error::{ReportError, ReportResult};
use crate::logs::{log_error, log_success, log_warning};
use crate::models::{ObservationRow, Respondent};
use crate::transform::aggregate::Aggregates;

pub const BY_RESPONDENT_FILE: &str = "output_by_respondant.csv";
pub const TOOL_LIST_FILE: &str = "tools.txt";
pub const OBSERVATIONS_FILE: &str = "output_weightened.csv";
pub const OBSERVATIONS_NO_WYSIWYG_FILE: &str = "output_weightened_no_wysiwyg.csv";
pub const NORMALIZED_FILE: &str = "output_weightened_normalized_by_discipline_cat.csv";
pub const NORMALIZED_NO_WYSIWYG_FILE: &str =
    "output_weightened_normalized_by_discipline_cat_no_wysiwyg.csv";
pub const USAGE_FILE: &str = "tools_use.csv";
pub const POPULARITY_FILE: &str = "tools_popularity.csv";
pub const POPULARITY_TOP_FILE: &str = "tools_popularity_top.csv";
pub const CATEGORY_POPULARITY_FILE: &str = "tool_categories_popularity.csv";
pub const POPULARITY_BY_DISCIPLINE_FILE: &str = "tools_popularity_by_discipline.csv";
pub const CATEGORIES_BY_DISCIPLINE_CAT_FILE: &str = "tool_categories_by_discipline_cat.csv";
pub const RESPONDENTS_BY_DISCIPLINE_CAT_FILE: &str = "respondents_by_discipline_cat.csv";

/// Separator between multiple values in one cell.
pub const LIST_SEPARATOR: &str = " | ";

// =============================================================================
// Flat records
// =============================================================================

/// One line of the per-respondent summary.
#[derive(Debug, Default, Serialize)]
pub struct RespondentRecord<'a> {
    pub id: &'a str,
    pub role: &'a str,
    #[serde(rename = "last affiliation country")]
    pub last_affiliation_country: &'a str,
    #[serde(rename = "first publication year")]
    pub first_publication_year: &'a str,
    pub tools: String,
    pub disciplines: String,
}

impl<'a> From<&'a Respondent> for RespondentRecord<'a> {
    fn from(r: &'a Respondent) -> Self {
        Self {
            id: &r.basis.id,
            role: &r.basis.role,
            last_affiliation_country: &r.basis.last_affiliation_country,
            first_publication_year: &r.basis.first_publication_year,
            tools: r.tools.join(LIST_SEPARATOR),
            disciplines: r.disciplines.join(LIST_SEPARATOR),
        }
    }
}

/// One line of the observation tables.
#[derive(Debug, Default, Serialize)]
pub struct ObservationRecord<'a> {
    pub id: &'a str,
    pub role: &'a str,
    #[serde(rename = "last affiliation country")]
    pub last_affiliation_country: &'a str,
    #[serde(rename = "first publication year")]
    pub first_publication_year: &'a str,
    pub weight: f64,
    pub tool: &'a str,
    #[serde(rename = "famille d'outil")]
    pub tool_category: &'a str,
    pub discipline: &'a str,
    pub discipline_cat: &'a str,
}

impl<'a> From<&'a ObservationRow> for ObservationRecord<'a> {
    fn from(o: &'a ObservationRow) -> Self {
        Self {
            id: &o.basis.id,
            role: &o.basis.role,
            last_affiliation_country: &o.basis.last_affiliation_country,
            first_publication_year: &o.basis.first_publication_year,
            weight: o.weight,
            tool: &o.tool,
            tool_category: &o.tool_category,
            discipline: &o.discipline,
            discipline_cat: o.discipline_category.as_deref().unwrap_or(""),
        }
    }
}

// =============================================================================
// Rendering
// =============================================================================

/// A rendered table waiting to be written.
#[derive(Debug, Clone)]
pub struct Report {
    pub name: String,
    pub file_name: String,
    pub body: Vec<u8>,
    pub rows: usize,
}

impl Report {
    /// Serialize `rows` as delimited text with a header line.
    ///
    /// The header is derived from the record type, so an empty table still
    /// gets one.
    pub fn csv<T: Serialize + Default>(
        name: &str,
        file_name: impl Into<String>,
        rows: &[T],
        delimiter: u8,
    ) -> ReportResult<Self> {
        let csv_error = |source: csv::Error| ReportError::Csv {
            table: name.to_string(),
            source,
        };

        let body = if rows.is_empty() {
            log_warning(format!("{}: no rows", name));
            header_only::<T>(delimiter).map_err(csv_error)?
        } else {
            let mut writer = csv::WriterBuilder::new()
                .delimiter(delimiter)
                .from_writer(Vec::new());
            for row in rows {
                writer.serialize(row).map_err(csv_error)?;
            }
            writer
                .into_inner()
                .map_err(|_| ReportError::Flush(name.to_string()))?
        };

        Ok(Self {
            name: name.to_string(),
            file_name: file_name.into(),
            body,
            rows: rows.len(),
        })
    }

    /// One value per line.
    pub fn lines(name: &str, file_name: impl Into<String>, lines: &[String]) -> Self {
        Self {
            name: name.to_string(),
            file_name: file_name.into(),
            body: lines.join("\n").into_bytes(),
            rows: lines.len(),
        }
    }
}

/// Header line of `T`, taken from a serialized default record.
fn header_only<T: Serialize + Default>(delimiter: u8) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());
    writer.serialize(T::default())?;
    let mut body = writer.into_inner().map_err(|e| e.into_error())?;
    let header_end = body
        .iter()
        .position(|&b| b == b'\n')
        .map_or(body.len(), |i| i + 1);
    body.truncate(header_end);
    Ok(body)
}

/// `output_weightened_<label>.csv`, with path-hostile characters replaced.
pub fn discipline_file_name(label: &str) -> String {
    let safe = regex::Regex::new(r#"[/\\:*?"<>|]+"#)
        .ok()
        .map(|re| re.replace_all(label, "_").to_string())
        .unwrap_or_else(|| label.to_string());
    format!("output_weightened_{}.csv", safe)
}

fn observation_records(rows: &[ObservationRow]) -> Vec<ObservationRecord<'_>> {
    rows.iter().map(ObservationRecord::from).collect()
}

/// Tables rendered for one run, and those that could not be.
#[derive(Debug, Default)]
pub struct Rendered {
    pub reports: Vec<Report>,
    /// Table name and error of each failed rendering.
    pub failed: Vec<(String, String)>,
}

impl Rendered {
    /// Keep a rendered table, or log and list its failure.
    pub fn add(&mut self, result: ReportResult<Report>) {
        match result {
            Ok(report) => self.reports.push(report),
            Err(e) => {
                let table = e.table().to_string();
                log_error(format!("{}: {}", table, e));
                self.failed.push((table, e.to_string()));
            }
        }
    }
}

/// Render every table of a run.
///
/// Fails as a whole only on an output delimiter that is not ASCII.
pub fn render_all(aggregates: &Aggregates, options: &ReportOptions) -> ReportResult<Rendered> {
    if !options.output_delimiter.is_ascii() {
        return Err(ReportError::Delimiter(options.output_delimiter));
    }
    let d = options.output_delimiter as u8;
    let summaries: Vec<RespondentRecord> =
        aggregates.respondents.iter().map(RespondentRecord::from).collect();

    let mut out = Rendered::default();
    out.add(Report::csv("by respondent", BY_RESPONDENT_FILE, &summaries, d));
    out.reports.push(Report::lines(
        "tool list",
        TOOL_LIST_FILE,
        &aggregates.tools_seen,
    ));
    out.add(Report::csv(
        "weighted observations",
        OBSERVATIONS_FILE,
        &observation_records(&aggregates.observations),
        d,
    ));
    out.add(Report::csv(
        "weighted observations without excluded family",
        OBSERVATIONS_NO_WYSIWYG_FILE,
        &observation_records(&aggregates.observations_no_wysiwyg),
        d,
    ));
    out.add(Report::csv(
        "normalized by discipline category",
        NORMALIZED_FILE,
        &aggregates.normalized,
        d,
    ));
    out.add(Report::csv(
        "normalized by discipline category without excluded family",
        NORMALIZED_NO_WYSIWYG_FILE,
        &aggregates.normalized_no_wysiwyg,
        d,
    ));
    out.add(Report::csv("tool usage", USAGE_FILE, &aggregates.usage, d));
    out.add(Report::csv(
        "tool usage top",
        format!("tools_use_{}.csv", options.top_n),
        &aggregates.usage_top,
        d,
    ));
    out.add(Report::csv("tool popularity", POPULARITY_FILE, &aggregates.popularity, d));
    out.add(Report::csv(
        "tool popularity top",
        POPULARITY_TOP_FILE,
        &aggregates.popularity_top,
        d,
    ));
    out.add(Report::csv(
        "tool family popularity",
        CATEGORY_POPULARITY_FILE,
        &aggregates.category_popularity,
        d,
    ));
    out.add(Report::csv(
        "tool popularity by discipline",
        POPULARITY_BY_DISCIPLINE_FILE,
        &aggregates.popularity_by_discipline,
        d,
    ));
    out.add(Report::csv(
        "tool families by discipline category",
        CATEGORIES_BY_DISCIPLINE_CAT_FILE,
        &aggregates.categories_by_discipline_cat,
        d,
    ));
    out.add(Report::csv(
        "respondents by discipline category",
        RESPONDENTS_BY_DISCIPLINE_CAT_FILE,
        &aggregates.respondents_by_discipline_cat,
        d,
    ));

    for (discipline, rows) in &aggregates.observations_by_discipline {
        out.add(Report::csv(
            &format!("observations for {}", discipline),
            discipline_file_name(discipline),
            &observation_records(rows),
            d,
        ));
    }

    Ok(out)
}

// =============================================================================
// Writing
// =============================================================================

/// Outcome of writing a batch of reports.
#[derive(Debug, Clone, Default)]
pub struct EmitSummary {
    /// Files written.
    pub written: Vec<PathBuf>,
    /// Table name and error of each failed write.
    pub failed: Vec<(String, String)>,
}

impl EmitSummary {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Write one report into `dir`.
pub async fn emit(report: &Report, dir: &Path) -> ReportResult<PathBuf> {
    let path = dir.join(&report.file_name);
    tokio::fs::write(&path, &report.body)
        .await
        .map_err(|source| ReportError::Io {
            path: path.display().to_string(),
            source,
        })?;
    Ok(path)
}

/// Write all reports concurrently. Never fails as a whole: failures are
/// logged and listed in the summary.
pub async fn emit_all(reports: Vec<Report>, dir: &Path) -> EmitSummary {
    let names: Vec<String> = reports.iter().map(|r| r.name.clone()).collect();
    let tasks = reports.into_iter().map(|report| {
        let dir = dir.to_path_buf();
        tokio::spawn(async move {
            let result = emit(&report, &dir).await;
            (report.rows, result)
        })
    });

    let mut summary = EmitSummary::default();
    for (name, joined) in names.into_iter().zip(join_all(tasks).await) {
        let outcome = match joined {
            Ok((rows, Ok(path))) => Ok((rows, path)),
            Ok((_, Err(e))) => Err(e),
            Err(_) => Err(ReportError::Join(name.clone())),
        };
        match outcome {
            Ok((rows, path)) => {
                log_success(format!("{} ({} rows) -> {}", name, rows, path.display()));
                summary.written.push(path);
            }
            Err(e) => {
                log_error(format!("{}: {}", name, e));
                summary.failed.push((name, e.to_string()));
            }
        }
    }
    summary
}
