//! Date extraction: matching, normalization and selection.

pub mod matcher;
pub mod normalizer;
pub mod patterns;
pub mod selector;

pub use matcher::{DateMatch, DateMatcher, DmyDateMatcher, normalize_text};
pub use normalizer::{CalendarPolicy, DateNormalizer, ReferenceYear};
pub use selector::{DateSelector, RejectReason, Selection, SelectionPolicy};
