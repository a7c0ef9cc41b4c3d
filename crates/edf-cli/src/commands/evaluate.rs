//! Evaluate command - run the date pipeline over a document set and compare
//! with ground truth.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use edf_core::validation::{DateBasis, IdentifierKey};
use edf_core::{
    CalendarPolicy, CaseRecord, EdfConfig, GroundTruth, Pipeline, ReferenceYear, ResultAggregator,
    SelectionPolicy, Status,
};

use super::config::load_config;
use super::documents::{Document, TextReader, discover};
use super::output::{OutputFormat, RunSettings, format_report};

/// Arguments for the evaluate command.
#[derive(Args)]
pub struct EvaluateArgs {
    /// Input directory or glob pattern
    #[arg(required = true)]
    input: String,

    /// Ground truth CSV (header row, identifier, one or two timestamps)
    #[arg(short, long)]
    ground_truth: Option<PathBuf>,

    /// Date selection policy (single_latest or pair)
    #[arg(short, long)]
    policy: Option<SelectionPolicy>,

    /// Year whose first two digits expand 2-digit years
    #[arg(long)]
    reference_year: Option<i32>,

    /// Handling of impossible dates (strict or rollover)
    #[arg(long)]
    calendar: Option<CalendarPolicy>,

    /// Calendar day of a ground truth timestamp (utc or local)
    #[arg(long)]
    date_basis: Option<DateBasis>,

    /// How document paths map to ground truth identifiers (file_name, file_stem or path)
    #[arg(long)]
    key: Option<IdentifierKey>,

    /// Number of parallel workers
    #[arg(short = 'j', long)]
    jobs: Option<usize>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also write a per-document CSV summary
    #[arg(long)]
    summary: Option<PathBuf>,

    /// OCR model directory
    #[arg(short, long)]
    model_dir: Option<PathBuf>,
}

impl EvaluateArgs {
    /// Command line flags take precedence over the config file.
    fn apply(&self, config: &mut EdfConfig) -> anyhow::Result<()> {
        if let Some(path) = &self.ground_truth {
            config.ground_truth.path = Some(path.clone());
        }
        if let Some(policy) = self.policy {
            config.selection.policy = policy;
        }
        if let Some(year) = self.reference_year {
            config.extraction.reference_year = Some(ReferenceYear::new(year)?);
        }
        if let Some(calendar) = self.calendar {
            config.extraction.calendar = calendar;
        }
        if let Some(basis) = self.date_basis {
            config.ground_truth.date_basis = basis;
        }
        if let Some(key) = self.key {
            config.ground_truth.key = key;
        }
        if let Some(jobs) = self.jobs {
            config.batch.jobs = jobs;
        }
        if let Some(model_dir) = &self.model_dir {
            config.ocr.model_dir = model_dir.clone();
        }
        Ok(())
    }
}

pub async fn run(args: EvaluateArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    args.apply(&mut config)?;

    // Ground truth must load completely before any document is touched
    let truth_path = config.ground_truth.path.clone().ok_or_else(|| {
        anyhow::anyhow!("No ground truth file given. Use --ground-truth or set ground_truth.path.")
    })?;
    let truth = GroundTruth::from_path(&truth_path, &config.ground_truth)
        .map_err(|e| anyhow::anyhow!("Failed to load {}: {}", truth_path.display(), e))?;

    let documents = discover(&args.input, &config.batch, config.ground_truth.key)?;
    if documents.is_empty() {
        anyhow::bail!("No matching files found for: {}", args.input);
    }

    eprintln!(
        "{} Found {} documents, {} ground truth records",
        style("ℹ").blue(),
        documents.len(),
        truth.len()
    );

    let pipeline = Pipeline::from_config(&config);
    let settings = RunSettings {
        policy: pipeline.policy(),
        reference_year: pipeline.reference_year(),
        calendar: pipeline.calendar_policy(),
    };
    info!(
        "Evaluating with policy {}, reference year {}, calendar {}",
        settings.policy, settings.reference_year, settings.calendar
    );

    let reader = TextReader::new(&documents, &config.ocr);
    let records = evaluate_documents(
        &documents,
        Arc::new(pipeline),
        Arc::new(truth),
        Arc::new(reader),
        config.batch.jobs,
    )
    .await?;

    let report = ResultAggregator::aggregate(&records, start.elapsed());

    if let Some(summary_path) = &args.summary {
        fs::write(summary_path, format_report(&report, settings, OutputFormat::Csv)?)?;
        eprintln!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    let output = format_report(&report, settings, args.format)?;
    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        eprintln!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        print!("{}", output);
    }

    eprintln!(
        "{} {} valid, {} invalid, {} undefined",
        style("✓").green(),
        style(report.count(Status::Valid)).green(),
        style(report.count(Status::Invalid)).red(),
        style(report.count(Status::Undefined)).yellow()
    );

    Ok(())
}

/// Run every document through the pipeline on blocking worker tasks.
///
/// Results are collected by identifier and returned in discovery order.
/// A document whose task fails is recorded as `Undefined`.
async fn evaluate_documents(
    documents: &[Document],
    pipeline: Arc<Pipeline>,
    truth: Arc<GroundTruth>,
    reader: Arc<TextReader>,
    jobs: usize,
) -> anyhow::Result<Vec<CaseRecord>> {
    let progress = ProgressBar::new(documents.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} documents",
            )?
            .progress_chars("=>-"),
    );

    let semaphore = Arc::new(Semaphore::new(jobs.max(1)));
    let mut tasks = JoinSet::new();

    for document in documents {
        let permit = semaphore.clone().acquire_owned().await?;
        let document = document.clone();
        let pipeline = Arc::clone(&pipeline);
        let truth = Arc::clone(&truth);
        let reader = Arc::clone(&reader);

        tasks.spawn_blocking(move || {
            let _permit = permit;
            let record = match reader.read(&document) {
                Ok(text) => pipeline.evaluate(&document.identifier, &text, &truth),
                Err(e) => {
                    warn!("Failed to read {}: {}", document.path.display(), e);
                    CaseRecord::failed(&document.identifier, truth.get(&document.identifier), e)
                }
            };
            (document.identifier, record)
        });
    }

    let mut results: HashMap<String, CaseRecord> = HashMap::with_capacity(documents.len());
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((identifier, record)) => {
                debug!("{}: {}", identifier, record.status());
                results.insert(identifier, record);
            }
            Err(e) => warn!("Worker task failed: {}", e),
        }
        progress.inc(1);
    }
    progress.finish_and_clear();

    Ok(documents
        .iter()
        .map(|doc| {
            results.remove(&doc.identifier).unwrap_or_else(|| {
                CaseRecord::failed(
                    &doc.identifier,
                    truth.get(&doc.identifier),
                    "processing task did not complete",
                )
            })
        })
        .collect())
}
