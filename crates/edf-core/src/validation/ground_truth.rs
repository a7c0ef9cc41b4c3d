//! Ground truth loading and identifier-keyed lookup.

use std::collections::HashMap;
use std::io::Read;
use std::path::{Component, Path};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{GroundTruthError, ValidationError};
use crate::models::case::ExpectedRecord;
use crate::models::config::GroundTruthConfig;

/// Which calendar day a timestamp with an offset stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateBasis {
    /// The date after converting the timestamp to UTC.
    #[default]
    Utc,
    /// The date as written, in the timestamp's own offset.
    Local,
}

impl std::str::FromStr for DateBasis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "utc" => Ok(DateBasis::Utc),
            "local" => Ok(DateBasis::Local),
            other => Err(format!("unknown date basis {:?} (expected utc or local)", other)),
        }
    }
}

/// How a document path becomes its identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierKey {
    /// File name with extension (`label_01.jpg`).
    #[default]
    FileName,
    /// File name without extension (`label_01`).
    FileStem,
    /// Path relative to the input root, `/`-separated.
    Path,
}

impl IdentifierKey {
    /// Identifier of a document found under `root`.
    pub fn for_document(self, path: &Path, root: Option<&Path>) -> String {
        match self {
            IdentifierKey::FileName => file_part(path, |p| p.file_name()),
            IdentifierKey::FileStem => file_part(path, |p| p.file_stem()),
            IdentifierKey::Path => {
                let relative = root
                    .and_then(|r| path.strip_prefix(r).ok())
                    .unwrap_or(path);
                join_components(relative)
            }
        }
    }

    /// Identifier of a ground truth row, as written in the identifier column.
    pub fn for_record(self, raw: &str) -> String {
        let unified = raw.trim().replace('\\', "/");
        self.for_document(Path::new(&unified), None)
    }
}

impl std::str::FromStr for IdentifierKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "file_name" | "name" => Ok(IdentifierKey::FileName),
            "file_stem" | "stem" => Ok(IdentifierKey::FileStem),
            "path" => Ok(IdentifierKey::Path),
            other => Err(format!(
                "unknown identifier key {:?} (expected file_name, file_stem or path)",
                other
            )),
        }
    }
}

fn file_part(path: &Path, part: impl Fn(&Path) -> Option<&std::ffi::OsStr>) -> String {
    part(path)
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| join_components(path))
}

fn join_components(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Parse one ground truth timestamp into a date.
///
/// Timestamps carry an explicit offset (`2024-06-01 00:00:00+03:00`).
/// Formats without an offset directive are read as UTC wall-clock time.
pub fn parse_timestamp(value: &str, format: &str, basis: DateBasis) -> Option<NaiveDate> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_str(value, format) {
        return Some(match basis {
            DateBasis::Local => dt.date_naive(),
            DateBasis::Utc => dt.with_timezone(&Utc).date_naive(),
        });
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
        return Some(naive.date());
    }
    NaiveDate::parse_from_str(value, format).ok()
}

/// Expected dates for every document, keyed by identifier.
#[derive(Debug, Clone, Default)]
pub struct GroundTruth {
    records: HashMap<String, ExpectedRecord>,
    order: Vec<String>,
}

impl GroundTruth {
    /// Build from already parsed records.
    pub fn from_records(records: Vec<ExpectedRecord>) -> Result<Self, GroundTruthError> {
        let mut truth = Self::default();
        for record in records {
            truth.insert(record)?;
        }
        Ok(truth)
    }

    /// Load from a CSV file.
    pub fn from_path(path: &Path, config: &GroundTruthConfig) -> Result<Self, GroundTruthError> {
        let file = std::fs::File::open(path)?;
        let truth = Self::from_reader(file, config)?;
        info!(
            "Loaded {} ground truth records from {}",
            truth.len(),
            path.display()
        );
        Ok(truth)
    }

    /// Load from CSV data. The first row is a header and is skipped.
    ///
    /// Column 0 holds the identifier; the remaining non-empty columns hold one
    /// or two timestamps.
    pub fn from_reader<R: Read>(
        reader: R,
        config: &GroundTruthConfig,
    ) -> Result<Self, GroundTruthError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut truth = Self::default();
        for (index, result) in csv_reader.records().enumerate() {
            // 1-based, counting the header
            let row = index + 2;
            let record = result?;

            let identifier = record
                .get(0)
                .filter(|s| !s.is_empty())
                .map(|s| config.key.for_record(s))
                .ok_or(GroundTruthError::MissingIdentifier { row })?;

            let dates = record
                .iter()
                .skip(1)
                .filter(|cell| !cell.is_empty())
                .map(|cell| {
                    let date = parse_timestamp(cell, &config.timestamp_format, config.date_basis);
                    date.ok_or_else(|| GroundTruthError::Timestamp {
                        row,
                        value: cell.to_string(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;

            match dates.len() {
                0 => return Err(GroundTruthError::MissingDate { row }),
                1 | 2 => {}
                count => return Err(GroundTruthError::TooManyDates { row, count }),
            }

            debug!("Ground truth row {}: {} -> {:?}", row, identifier, dates);
            truth.insert(ExpectedRecord::new(identifier, dates))?;
        }

        Ok(truth)
    }

    fn insert(&mut self, record: ExpectedRecord) -> Result<(), GroundTruthError> {
        if self.records.contains_key(&record.identifier) {
            return Err(GroundTruthError::Duplicate {
                identifier: record.identifier,
            });
        }
        self.order.push(record.identifier.clone());
        self.records.insert(record.identifier.clone(), record);
        Ok(())
    }

    /// Record for an identifier, if any.
    pub fn get(&self, identifier: &str) -> Option<&ExpectedRecord> {
        self.records.get(identifier)
    }

    /// Record for an identifier, or a lookup error.
    pub fn lookup(&self, identifier: &str) -> Result<&ExpectedRecord, ValidationError> {
        self.get(identifier).ok_or_else(|| ValidationError::Lookup {
            identifier: identifier.to_string(),
        })
    }

    /// Identifiers in source row order.
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn load(csv: &str) -> Result<GroundTruth, GroundTruthError> {
        GroundTruth::from_reader(csv.as_bytes(), &GroundTruthConfig::default())
    }

    #[test]
    fn test_load_single_dates() {
        let truth = load(
            "path,date\n\
             test/data/1.jpg,2024-06-01 12:00:00+03:00\n\
             test/data/2.jpg,2023-12-31 12:00:00+03:00\n",
        )
        .unwrap();

        assert_eq!(truth.len(), 2);
        assert_eq!(truth.get("1.jpg").unwrap().dates, vec![date(2024, 6, 1)]);
        assert_eq!(truth.get("2.jpg").unwrap().dates, vec![date(2023, 12, 31)]);
        assert_eq!(truth.identifiers().collect::<Vec<_>>(), vec!["1.jpg", "2.jpg"]);
    }

    #[test]
    fn test_load_date_pairs() {
        let truth = load(
            "path,issued,expires\n\
             doc.png,2024-01-01 12:00:00+03:00,2024-06-01 12:00:00+03:00\n",
        )
        .unwrap();
        assert_eq!(
            truth.get("doc.png").unwrap().dates,
            vec![date(2024, 1, 1), date(2024, 6, 1)]
        );
    }

    #[test]
    fn test_offset_resolved_to_utc_by_default() {
        let csv = "path,date\na.jpg,2024-06-01 00:00:00+03:00\n";
        assert_eq!(load(csv).unwrap().get("a.jpg").unwrap().dates, vec![date(2024, 5, 31)]);

        let config = GroundTruthConfig {
            date_basis: DateBasis::Local,
            ..GroundTruthConfig::default()
        };
        let truth = GroundTruth::from_reader(csv.as_bytes(), &config).unwrap();
        assert_eq!(truth.get("a.jpg").unwrap().dates, vec![date(2024, 6, 1)]);
    }

    #[test]
    fn test_header_only_is_empty() {
        assert!(load("path,date\n").unwrap().is_empty());
    }

    #[test]
    fn test_date_basis() {
        let format = "%Y-%m-%d %H:%M:%S%:z";
        let local = parse_timestamp("2024-06-01 00:00:00+03:00", format, DateBasis::Local);
        let utc = parse_timestamp("2024-06-01 00:00:00+03:00", format, DateBasis::Utc);
        assert_eq!(local, Some(date(2024, 6, 1)));
        assert_eq!(utc, Some(date(2024, 5, 31)));

        let noon = parse_timestamp("2024-06-01 12:00:00+03:00", format, DateBasis::Utc);
        assert_eq!(noon, Some(date(2024, 6, 1)));
    }

    #[test]
    fn test_naive_formats() {
        assert_eq!(
            parse_timestamp("2024-06-01 10:00:00", "%Y-%m-%d %H:%M:%S", DateBasis::Utc),
            Some(date(2024, 6, 1))
        );
        assert_eq!(
            parse_timestamp("01.06.2024", "%d.%m.%Y", DateBasis::Local),
            Some(date(2024, 6, 1))
        );
    }

    #[test]
    fn test_invalid_rows_are_fatal() {
        assert!(matches!(
            load("path,date\na.jpg,yesterday\n"),
            Err(GroundTruthError::Timestamp { row: 2, .. })
        ));
        assert!(matches!(
            load("path,date\na.jpg,\n"),
            Err(GroundTruthError::MissingDate { row: 2 })
        ));
        assert!(matches!(
            load("path,date\n,2024-06-01 00:00:00+03:00\n"),
            Err(GroundTruthError::MissingIdentifier { row: 2 })
        ));
        assert!(matches!(
            load(
                "p,a,b,c\n\
                 x.jpg,2024-06-01 12:00:00+03:00,\
                 2024-06-02 12:00:00+03:00,2024-06-03 12:00:00+03:00\n"
            ),
            Err(GroundTruthError::TooManyDates { row: 2, count: 3 })
        ));
    }

    #[test]
    fn test_duplicate_identifiers_are_fatal() {
        let result = load(
            "path,date\n\
             a/1.jpg,2024-06-01 00:00:00+03:00\n\
             b/1.jpg,2024-06-02 00:00:00+03:00\n",
        );
        assert!(matches!(
            result,
            Err(GroundTruthError::Duplicate { identifier }) if identifier == "1.jpg"
        ));
    }

    #[test]
    fn test_lookup_error() {
        let truth = load("path,date\na.jpg,2024-06-01 00:00:00+03:00\n").unwrap();
        assert!(truth.lookup("a.jpg").is_ok());
        assert_eq!(
            truth.lookup("b.jpg"),
            Err(ValidationError::Lookup {
                identifier: "b.jpg".to_string()
            })
        );
    }

    #[test]
    fn test_identifier_keys() {
        let root = Path::new("/data/scans");
        let path = Path::new("/data/scans/batch1/label.jpg");

        assert_eq!(IdentifierKey::FileName.for_document(path, Some(root)), "label.jpg");
        assert_eq!(IdentifierKey::FileStem.for_document(path, Some(root)), "label");
        assert_eq!(IdentifierKey::Path.for_document(path, Some(root)), "batch1/label.jpg");
        assert_eq!(IdentifierKey::Path.for_record("./batch1\\label.jpg"), "batch1/label.jpg");
        assert_eq!("stem".parse::<IdentifierKey>().unwrap(), IdentifierKey::FileStem);
    }
}
