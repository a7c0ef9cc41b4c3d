//! Core library for measuring how well dates survive OCR.
//!
//! This crate provides:
//! - Date extraction from noisy OCR text (matching, normalization, selection)
//! - Validation against identifier-keyed ground truth
//! - Aggregation of per-document results into a report
//! - Text extraction backends (plain transcripts, pure Rust OCR)

pub mod dates;
pub mod error;
pub mod models;
pub mod ocr;
pub mod pipeline;
pub mod report;
pub mod validation;

pub use dates::{
    CalendarPolicy, DateMatcher, DmyDateMatcher, ReferenceYear, Selection, SelectionPolicy,
};
pub use error::{EdfError, Result};
pub use models::{CaseRecord, EdfConfig, ExpectedRecord, Status};
#[cfg(feature = "native")]
pub use ocr::PureOcrEngine;
pub use ocr::{PlainTextExtractor, TextExtractor};
pub use pipeline::{Extraction, Pipeline};
pub use report::{Report, ResultAggregator};
pub use validation::{GroundTruth, ValidationEngine};
