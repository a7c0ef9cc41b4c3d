//! Reduction of a document's dates into its result.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Policy deciding which dates stand for a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// One representative date: the latest one found.
    #[default]
    SingleLatest,
    /// An ordered pair of dates, compared position by position.
    Pair,
}

impl SelectionPolicy {
    /// Number of expected dates this policy compares.
    pub fn required_dates(self) -> usize {
        match self {
            SelectionPolicy::SingleLatest => 1,
            SelectionPolicy::Pair => 2,
        }
    }
}

impl fmt::Display for SelectionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionPolicy::SingleLatest => write!(f, "single_latest"),
            SelectionPolicy::Pair => write!(f, "pair"),
        }
    }
}

impl FromStr for SelectionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "single_latest" | "single" | "latest" => Ok(SelectionPolicy::SingleLatest),
            "pair" => Ok(SelectionPolicy::Pair),
            other => Err(format!(
                "unknown selection policy {:?} (expected single_latest or pair)",
                other
            )),
        }
    }
}

/// Why a selection could not produce a comparable result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// A pair was required but more than two dates were found.
    AmbiguousPair,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::AmbiguousPair => write!(f, "more than two dates found for a pair"),
        }
    }
}

/// Outcome of date selection for one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Selection {
    /// No dates were found.
    Empty,
    /// A single representative date, or the only date found for a pair.
    Single { date: NaiveDate },
    /// An ordered pair of dates.
    Pair { first: NaiveDate, second: NaiveDate },
    /// Dates were found but do not fit the policy.
    Rejected { reason: RejectReason },
}

impl Selection {
    /// Dates carried by the selection, in comparison order.
    pub fn dates(&self) -> Vec<NaiveDate> {
        match self {
            Selection::Empty | Selection::Rejected { .. } => Vec::new(),
            Selection::Single { date } => vec![*date],
            Selection::Pair { first, second } => vec![*first, *second],
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Selection::Empty)
    }
}

/// Applies a [`SelectionPolicy`] to the dates of one document.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateSelector {
    policy: SelectionPolicy,
}

impl DateSelector {
    pub fn new(policy: SelectionPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> SelectionPolicy {
        self.policy
    }

    /// Reduce the dates found in a document, in order of appearance.
    pub fn select(&self, dates: &[NaiveDate]) -> Selection {
        match (self.policy, dates) {
            (_, []) => Selection::Empty,
            (SelectionPolicy::SingleLatest, _) => latest(dates)
                .map(|date| Selection::Single { date })
                .unwrap_or(Selection::Empty),
            (SelectionPolicy::Pair, [date]) => Selection::Single { date: *date },
            (SelectionPolicy::Pair, [first, second]) => Selection::Pair {
                first: *first,
                second: *second,
            },
            (SelectionPolicy::Pair, _) => Selection::Rejected {
                reason: RejectReason::AmbiguousPair,
            },
        }
    }
}

/// Latest date; on ties the earliest occurrence wins.
fn latest(dates: &[NaiveDate]) -> Option<NaiveDate> {
    dates
        .iter()
        .copied()
        .fold(None, |best, date| match best {
            Some(current) if current >= date => Some(current),
            _ => Some(date),
        })
}
