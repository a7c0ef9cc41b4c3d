//! Comparison of extracted dates against the ground truth.

pub mod ground_truth;

pub use ground_truth::{DateBasis, GroundTruth, IdentifierKey, parse_timestamp};

use tracing::trace;

use crate::dates::{Selection, SelectionPolicy};
use crate::models::case::{ExpectedRecord, Status};

/// Classifies a document's selection against its expected record.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationEngine {
    policy: SelectionPolicy,
}

impl ValidationEngine {
    pub fn new(policy: SelectionPolicy) -> Self {
        Self { policy }
    }

    /// Exact comparison of every position the policy requires.
    ///
    /// An empty selection is `Undefined` without looking at the expected
    /// record. Missing positions on either side count as a mismatch.
    pub fn validate(&self, selection: &Selection, expected: &ExpectedRecord) -> Status {
        if selection.is_empty() {
            return Status::Undefined;
        }

        let required = self.policy.required_dates();
        let extracted = selection.dates();
        if extracted.len() < required || expected.dates.len() < required {
            trace!(
                "{}: {} extracted, {} expected, {} required",
                expected.identifier,
                extracted.len(),
                expected.dates.len(),
                required
            );
            return Status::Invalid;
        }

        let equal = extracted
            .iter()
            .zip(&expected.dates)
            .take(required)
            .all(|(found, wanted)| found == wanted);

        if equal {
            Status::Valid
        } else {
            Status::Invalid
        }
    }
}
