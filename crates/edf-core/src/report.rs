//! Grouping of classified records for reporting.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::models::case::{CaseRecord, Status};

/// Records sharing one status, in encounter order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusGroup {
    pub status: Status,
    pub count: usize,
    pub cases: Vec<CaseRecord>,
}

/// Grouped results of an evaluation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Number of documents evaluated.
    pub total: usize,
    /// Groups in `Valid`, `Invalid`, `Undefined` order.
    pub groups: Vec<StatusGroup>,
    /// Wall-clock time of the whole run.
    pub elapsed_ms: u64,
}

impl Report {
    /// Records with the given status.
    pub fn group(&self, status: Status) -> &[CaseRecord] {
        self.groups
            .iter()
            .find(|g| g.status == status)
            .map(|g| g.cases.as_slice())
            .unwrap_or(&[])
    }

    pub fn count(&self, status: Status) -> usize {
        self.group(status).len()
    }

    /// Share of documents classified `Valid` (0.0 - 1.0).
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.count(Status::Valid) as f64 / self.total as f64
    }

    /// All records in encounter order.
    pub fn records(&self) -> impl Iterator<Item = &CaseRecord> {
        self.groups.iter().flat_map(|g| g.cases.iter())
    }
}

/// Builds a [`Report`] from classified records.
pub struct ResultAggregator;

impl ResultAggregator {
    /// Group records by status, keeping encounter order inside each group.
    pub fn aggregate(records: &[CaseRecord], elapsed: Duration) -> Report {
        let groups = Status::ALL
            .iter()
            .map(|&status| {
                let cases: Vec<CaseRecord> = records
                    .iter()
                    .filter(|r| r.status() == status)
                    .cloned()
                    .collect();
                StatusGroup {
                    status,
                    count: cases.len(),
                    cases,
                }
            })
            .collect();

        Report {
            total: records.len(),
            groups,
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }
}
