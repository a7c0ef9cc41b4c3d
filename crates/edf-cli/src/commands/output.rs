//! Report rendering: plain text, JSON and CSV.

use std::fmt::Write as _;
use std::time::Duration;

use chrono::NaiveDate;
use serde::Serialize;

use edf_core::{CalendarPolicy, CaseRecord, ReferenceYear, Report, SelectionPolicy, Status};

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// Grouped plain text report
    Text,
    /// JSON output
    Json,
    /// CSV, one row per document
    Csv,
}

/// Pipeline settings a run was made with.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RunSettings {
    pub policy: SelectionPolicy,
    pub reference_year: ReferenceYear,
    pub calendar: CalendarPolicy,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    settings: RunSettings,
    accuracy: f64,
    #[serde(flatten)]
    report: &'a Report,
}

pub fn format_report(
    report: &Report,
    settings: RunSettings,
    format: OutputFormat,
) -> anyhow::Result<String> {
    match format {
        OutputFormat::Text => Ok(format_text(report, settings)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&JsonReport {
            settings,
            accuracy: report.accuracy(),
            report,
        })?),
        OutputFormat::Csv => format_csv(report),
    }
}

/// Dates as `YYYY-MM-DD`, comma separated, or `-` when there are none.
pub fn format_dates(dates: &[NaiveDate]) -> String {
    if dates.is_empty() {
        return "-".to_string();
    }
    dates
        .iter()
        .map(|d| d.format("%Y-%m-%d").to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_text(report: &Report, settings: RunSettings) -> String {
    let mut output = String::new();

    let _ = writeln!(
        output,
        "Done in {:?} (policy: {}, reference year: {}, calendar: {})",
        Duration::from_millis(report.elapsed_ms),
        settings.policy,
        settings.reference_year,
        settings.calendar,
    );

    for group in &report.groups {
        let _ = writeln!(output, "{} cases: {}", group.status, group.count);
        for case in &group.cases {
            let _ = writeln!(output, "\t{}", describe_case(case));
        }
    }

    let _ = writeln!(
        output,
        "Accuracy: {:.1}% ({}/{})",
        report.accuracy() * 100.0,
        report.count(Status::Valid),
        report.total
    );

    output
}

fn describe_case(case: &CaseRecord) -> String {
    let mut line = format!(
        "{} - {}",
        case.identifier(),
        format_dates(case.extracted_dates())
    );

    if case.status() == Status::Invalid {
        if let Some(expected) = case.expected_dates() {
            let _ = write!(line, " (expected {})", format_dates(expected));
        }
    }
    if case.extracted_dates().is_empty() && !case.candidates().is_empty() {
        let _ = write!(line, " (found {})", format_dates(case.candidates()));
    }
    if let Some(error) = case.error() {
        let _ = write!(line, " [{}]", error);
    }

    line
}

fn format_csv(report: &Report) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "identifier",
        "status",
        "extracted",
        "expected",
        "candidates",
        "error",
    ])?;

    for case in report.records() {
        wtr.write_record([
            case.identifier(),
            case.status().as_str(),
            &format_dates(case.extracted_dates()),
            &case.expected_dates().map(format_dates).unwrap_or_default(),
            &format_dates(case.candidates()),
            case.error().unwrap_or(""),
        ])?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use edf_core::{ExpectedRecord, GroundTruth, Pipeline, ResultAggregator};

    fn report() -> Report {
        let truth = GroundTruth::from_records(vec![
            ExpectedRecord::new("1.txt", vec![NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()]),
            ExpectedRecord::new("2.txt", vec![NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()]),
        ])
        .unwrap();
        let pipeline =
            Pipeline::new(ReferenceYear::new(2025).unwrap(), SelectionPolicy::SingleLatest);
        let records = vec![
            pipeline.evaluate("1.txt", "01.06.2024", &truth),
            pipeline.evaluate("2.txt", "02.06.2024", &truth),
            pipeline.evaluate("3.txt", "nothing", &truth),
        ];
        ResultAggregator::aggregate(&records, Duration::from_millis(20))
    }

    fn settings() -> RunSettings {
        RunSettings {
            policy: SelectionPolicy::SingleLatest,
            reference_year: ReferenceYear::new(2025).unwrap(),
            calendar: CalendarPolicy::Strict,
        }
    }

    #[test]
    fn test_text_report() {
        let text = format_report(&report(), settings(), OutputFormat::Text).unwrap();

        assert!(text.contains("policy: single_latest, reference year: 2025, calendar: strict"));
        assert!(text.contains("valid cases: 1\n\t1.txt - 2024-06-01\n"));
        assert!(text.contains("invalid cases: 1\n\t2.txt - 2024-06-02 (expected 2024-06-01)\n"));
        assert!(text.contains("undefined cases: 1\n\t3.txt - -\n"));
        assert!(text.contains("Accuracy: 33.3% (1/3)"));
    }

    #[test]
    fn test_csv_report() {
        let csv = format_report(&report(), settings(), OutputFormat::Csv).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines[0], "identifier,status,extracted,expected,candidates,error");
        assert_eq!(lines[1], "1.txt,valid,2024-06-01,2024-06-01,2024-06-01,");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn test_json_report() {
        let json = format_report(&report(), settings(), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["total"], 3);
        assert_eq!(value["settings"]["policy"], "single_latest");
        assert_eq!(value["groups"][0]["status"], "valid");
        assert_eq!(value["groups"][0]["cases"][0]["extracted_dates"][0], "2024-06-01");
    }
}
