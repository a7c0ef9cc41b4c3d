//! Per-document evaluation records.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates::Selection;

/// Classification of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Nothing could be extracted or compared.
    Undefined,
    /// Extracted date(s) equal the ground truth.
    Valid,
    /// Extracted date(s) differ from the ground truth.
    Invalid,
}

impl Status {
    /// All statuses in report order.
    pub const ALL: [Status; 3] = [Status::Valid, Status::Invalid, Status::Undefined];

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Undefined => "undefined",
            Status::Valid => "valid",
            Status::Invalid => "invalid",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Expected date(s) for one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedRecord {
    /// Document identifier.
    pub identifier: String,
    /// One or two expected dates, in order.
    pub dates: Vec<NaiveDate>,
}

impl ExpectedRecord {
    pub fn new(identifier: impl Into<String>, dates: Vec<NaiveDate>) -> Self {
        Self {
            identifier: identifier.into(),
            dates,
        }
    }
}

/// Evaluation result for one document.
///
/// Built once by the pipeline and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseRecord {
    identifier: String,
    /// Every date found in the text, before selection.
    candidates: Vec<NaiveDate>,
    /// Dates chosen by the selector (0, 1 or 2).
    extracted_dates: Vec<NaiveDate>,
    /// Expected dates, if a ground truth record was found.
    #[serde(skip_serializing_if = "Option::is_none")]
    expected_dates: Option<Vec<NaiveDate>>,
    selection: Selection,
    status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl CaseRecord {
    pub(crate) fn new(
        identifier: String,
        candidates: Vec<NaiveDate>,
        selection: Selection,
        expected: Option<&ExpectedRecord>,
        status: Status,
        error: Option<String>,
    ) -> Self {
        Self {
            identifier,
            candidates,
            extracted_dates: selection.dates(),
            expected_dates: expected.map(|e| e.dates.clone()),
            selection,
            status,
            error,
        }
    }

    /// Record for a document that failed before its text reached the
    /// pipeline (unreadable file, OCR failure, crashed task).
    pub fn failed(
        identifier: impl Into<String>,
        expected: Option<&ExpectedRecord>,
        error: impl fmt::Display,
    ) -> Self {
        Self::new(
            identifier.into(),
            Vec::new(),
            Selection::Empty,
            expected,
            Status::Undefined,
            Some(error.to_string()),
        )
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn candidates(&self) -> &[NaiveDate] {
        &self.candidates
    }

    pub fn extracted_dates(&self) -> &[NaiveDate] {
        &self.extracted_dates
    }

    pub fn expected_dates(&self) -> Option<&[NaiveDate]> {
        self.expected_dates.as_deref()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}
