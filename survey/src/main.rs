//! Survey Report CLI - weighted tool usage tables from a survey export
//!
//! # Main Commands
//!
//! ```bash
//! survey-report run                               # dataset101.csv + tools.csv -> ./
//! survey-report run -s survey.csv -t tools.csv -o out/ --top 15
//! ```
//!
//! # Debug Commands (for development)
//!
//! ```bash
//! survey-report parse input.csv     # Just parse a table to JSON
//! survey-report example-layout      # Show the default survey layout
//! ```
//!
//! Paths fall back to `SURVEY_INPUT`, `SURVEY_TOOLS`, `SURVEY_OUTPUT` and
//! `SURVEY_LAYOUT`, which may come from a `.env` file.

use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use survey_report::{
    parse_file, run, EmptyToolsPolicy, ReportOptions, RunPaths, SurveyLayout,
};

#[derive(Parser)]
#[command(name = "survey-report")]
#[command(about = "Weighted writing-tool usage reports from survey responses", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Full pipeline: survey + tool reference -> report tables
    Run {
        /// Survey table (semicolon-delimited)
        #[arg(short, long, env = "SURVEY_INPUT", default_value = "dataset101.csv")]
        survey: PathBuf,

        /// Tool reference table with `tool` and `famille` columns
        #[arg(short, long, env = "SURVEY_TOOLS", default_value = "tools.csv")]
        tools: PathBuf,

        /// Output directory
        #[arg(short, long, env = "SURVEY_OUTPUT", default_value = ".")]
        output: PathBuf,

        /// Survey layout JSON (default: built-in layout)
        #[arg(short, long, env = "SURVEY_LAYOUT")]
        layout: Option<PathBuf>,

        /// What to do with respondents who selected no tool
        #[arg(long, value_enum, default_value_t = EmptyToolsPolicy::Exclude)]
        on_empty_tools: EmptyToolsPolicy,

        /// Length of the top-N tables
        #[arg(long, default_value = "10")]
        top: usize,

        /// Auto-detect the survey delimiter instead of assuming ';'
        #[arg(long)]
        detect_delimiter: bool,
    },

    /// Parse a delimited file and output JSON
    Parse {
        /// Input file
        input: PathBuf,

        /// Delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the default survey layout
    ExampleLayout,
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            survey,
            tools,
            output,
            layout,
            on_empty_tools,
            top,
            detect_delimiter,
        } => {
            let paths = RunPaths {
                survey,
                tools,
                output_dir: output,
            };
            let mut options = ReportOptions {
                on_empty_tools,
                top_n: top,
                ..ReportOptions::default()
            };
            if detect_delimiter {
                options.survey_delimiter = None;
            }
            cmd_run(&paths, layout.as_deref(), &options).await
        }

        Commands::Parse {
            input,
            delimiter,
            output,
        } => cmd_parse(&input, delimiter, output.as_deref()),

        Commands::ExampleLayout => cmd_example_layout(),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

async fn cmd_run(
    paths: &RunPaths,
    layout_path: Option<&Path>,
    options: &ReportOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let layout = match layout_path {
        Some(p) => {
            eprintln!("📐 Layout: {}", p.display());
            SurveyLayout::from_file(p)?
        }
        None => SurveyLayout::default(),
    };

    let summary = run(paths, &layout, options).await?;

    eprintln!("\n📊 Results:");
    eprintln!("   Rows: {}", summary.rows);
    eprintln!("   Respondents: {}", summary.respondents);
    eprintln!("   Excluded (no tool): {}", summary.excluded);
    eprintln!("   Observations: {}", summary.observations);
    eprintln!("   Total weight: {:.3}", summary.total_weight);
    eprintln!("   Tables written: {}", summary.tables_written);
    if !summary.issues.is_empty() {
        eprintln!("   Warnings and errors: {}", summary.issues.len());
    }

    if !summary.tables_failed.is_empty() {
        eprintln!("\n⚠️  Failed tables:");
        for (name, err) in &summary.tables_failed {
            eprintln!("   - {}: {}", name, err);
        }
    }

    eprintln!("\n✨ Done!");
    Ok(())
}

fn cmd_parse(
    input: &Path,
    delimiter: Option<char>,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Parsing: {}", input.display());

    let result = parse_file(input, delimiter)?;

    eprintln!("   Encoding: {}", result.encoding);
    eprintln!(
        "   Delimiter: '{}'{}",
        format_delimiter(result.delimiter),
        if delimiter.is_none() { " (auto-detected)" } else { "" }
    );
    eprintln!("   Columns: {}", result.headers.join(", "));
    eprintln!("✅ Parsed {} records", result.records.len());

    let json = serde_json::to_string_pretty(&result.records)?;
    write_output(&json, output)?;

    Ok(())
}

fn cmd_example_layout() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", SurveyLayout::default().to_json()?);
    Ok(())
}

fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
