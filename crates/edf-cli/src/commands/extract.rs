//! Extract command - show the dates found in a single document.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Args;
use console::style;
use serde::Serialize;

use edf_core::dates::{DateMatch, Selection};
use edf_core::{CalendarPolicy, Pipeline, ReferenceYear, SelectionPolicy};

use super::config::load_config;
use super::documents::{TextReader, discover};
use super::output::{RunSettings, format_dates};

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Input file (transcript or image)
    #[arg(required_unless_present = "text", conflicts_with = "text")]
    input: Option<PathBuf>,

    /// Use this text instead of reading a file
    #[arg(short, long)]
    text: Option<String>,

    /// Date selection policy (single_latest or pair)
    #[arg(short, long)]
    policy: Option<SelectionPolicy>,

    /// Year whose first two digits expand 2-digit years
    #[arg(long)]
    reference_year: Option<i32>,

    /// Handling of impossible dates (strict or rollover)
    #[arg(long)]
    calendar: Option<CalendarPolicy>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: ExtractFormat,

    /// OCR model directory
    #[arg(short, long)]
    model_dir: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum ExtractFormat {
    /// Plain text listing
    Text,
    /// JSON output
    Json,
}

#[derive(Serialize)]
struct ExtractOutput<'a> {
    settings: RunSettings,
    matches: &'a [DateMatch],
    dates: &'a [NaiveDate],
    selection: &'a Selection,
}

pub async fn run(args: ExtractArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(policy) = args.policy {
        config.selection.policy = policy;
    }
    if let Some(year) = args.reference_year {
        config.extraction.reference_year = Some(ReferenceYear::new(year)?);
    }
    if let Some(calendar) = args.calendar {
        config.extraction.calendar = calendar;
    }
    if let Some(model_dir) = args.model_dir {
        config.ocr.model_dir = model_dir;
    }

    let text = match (args.text, args.input) {
        (Some(text), _) => text,
        (None, Some(input)) => {
            if !input.is_file() {
                anyhow::bail!("Input file not found: {}", input.display());
            }
            let input = input.to_string_lossy();
            let documents = discover(&input, &config.batch, config.ground_truth.key)?;
            let document = documents
                .first()
                .ok_or_else(|| anyhow::anyhow!("Unsupported file type: {}", input))?;
            TextReader::new(&documents, &config.ocr).read(document)?
        }
        (None, None) => anyhow::bail!("Give an input file or --text"),
    };

    let pipeline = Pipeline::from_config(&config);
    let settings = RunSettings {
        policy: pipeline.policy(),
        reference_year: pipeline.reference_year(),
        calendar: pipeline.calendar_policy(),
    };
    let extraction = pipeline.extract(&text)?;

    match args.format {
        ExtractFormat::Json => {
            let output = ExtractOutput {
                settings,
                matches: &extraction.matches,
                dates: &extraction.dates,
                selection: &extraction.selection,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        ExtractFormat::Text => {
            println!(
                "{} {} date candidates (reference year: {}, calendar: {})",
                style("ℹ").blue(),
                extraction.matches.len(),
                settings.reference_year,
                settings.calendar
            );
            for (m, date) in extraction.matches.iter().zip(&extraction.dates) {
                println!(
                    "\t{} at {}..{} -> {}",
                    m.raw,
                    m.position.0,
                    m.position.1,
                    date.format("%Y-%m-%d")
                );
            }
            println!(
                "Selected ({}): {}",
                settings.policy,
                describe_selection(&extraction.selection)
            );
        }
    }

    Ok(())
}

fn describe_selection(selection: &Selection) -> String {
    match selection {
        Selection::Empty => "-".to_string(),
        Selection::Rejected { reason } => format!("none, {}", reason),
        other => format_dates(&other.dates()),
    }
}
