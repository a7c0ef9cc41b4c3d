//! Error types for the edf-core library.

use thiserror::Error;

/// Main error type for the edf library.
#[derive(Error, Debug)]
pub enum EdfError {
    /// Date extraction or normalization error.
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Validation error.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Ground truth loading error.
    #[error("ground truth error: {0}")]
    GroundTruth(#[from] GroundTruthError),

    /// Text extraction (OCR) error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors raised while turning a matched substring into a calendar date.
///
/// Both variants are scoped to a single document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    /// A field of the match is not an integer, or the match does not split
    /// into day, month and year.
    #[error("failed to parse {field} in {raw:?}")]
    MatchParse { raw: String, field: String },

    /// The fields do not form a calendar date.
    #[error("{raw:?} is not a calendar date ({year:04}-{month:02}-{day:02})")]
    Construction {
        raw: String,
        year: i32,
        month: u32,
        day: u32,
    },
}

/// Errors raised while classifying a document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// No ground truth record exists for the document.
    #[error("no ground truth record for {identifier}")]
    Lookup { identifier: String },
}

/// Errors raised while loading the ground truth table.
///
/// Any of these aborts a run before documents are processed.
#[derive(Error, Debug)]
pub enum GroundTruthError {
    /// The ground truth file could not be read.
    #[error("failed to read ground truth: {0}")]
    Io(#[from] std::io::Error),

    /// The CSV structure is malformed.
    #[error("malformed ground truth CSV: {0}")]
    Csv(#[from] csv::Error),

    /// A row has an empty identifier column.
    #[error("row {row}: missing identifier")]
    MissingIdentifier { row: usize },

    /// A row has no expected date.
    #[error("row {row}: missing expected date")]
    MissingDate { row: usize },

    /// A row holds more than two expected dates.
    #[error("row {row}: expected at most 2 dates, found {count}")]
    TooManyDates { row: usize, count: usize },

    /// A timestamp does not follow the expected format.
    #[error("row {row}: invalid timestamp {value:?}")]
    Timestamp { row: usize, value: String },

    /// The same identifier appears on two rows.
    #[error("duplicate identifier {identifier}")]
    Duplicate { identifier: String },
}

/// Errors related to text extraction.
#[derive(Error, Debug)]
pub enum OcrError {
    /// Failed to load OCR models.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// The input bytes could not be decoded.
    #[error("failed to decode input: {0}")]
    Decode(String),

    /// Text recognition failed.
    #[error("text recognition failed: {0}")]
    Recognition(String),
}

/// Result type for the edf library.
pub type Result<T> = std::result::Result<T, EdfError>;
