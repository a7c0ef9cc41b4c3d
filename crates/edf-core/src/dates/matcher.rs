//! Text normalization and date-shaped substring matching.

use serde::{Deserialize, Serialize};

use super::patterns::{DATE_DMY, LINE_BREAK};

/// Collapse every line break into a single space.
///
/// `\r\n` counts as one break. Case, punctuation and other whitespace are
/// left as they are.
pub fn normalize_text(text: &str) -> String {
    LINE_BREAK.replace_all(text, " ").into_owned()
}

/// A date-shaped substring found in normalized text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateMatch {
    /// Matched text, exactly as it appears in the source.
    pub raw: String,
    /// Raw day field.
    pub day: String,
    /// Raw month field.
    pub month: String,
    /// Raw year field (2 or 4 digits).
    pub year: String,
    /// First separator (`.` or `/`).
    pub separator: char,
    /// Byte span in the normalized text.
    pub position: (usize, usize),
}

/// Trait for date-shaped substring matchers.
///
/// New date layouts are added by implementing this trait; normalization,
/// selection and validation never look at the pattern itself.
pub trait DateMatcher: Send + Sync {
    /// Return every non-overlapping match in order of appearance.
    fn find_all(&self, text: &str) -> Vec<DateMatch>;
}

/// Day-month-year matcher with `.` or `/` separators.
#[derive(Debug, Clone, Copy, Default)]
pub struct DmyDateMatcher;

impl DmyDateMatcher {
    pub fn new() -> Self {
        Self
    }
}

impl DateMatcher for DmyDateMatcher {
    fn find_all(&self, text: &str) -> Vec<DateMatch> {
        DATE_DMY
            .captures_iter(text)
            .filter_map(|caps| {
                let full = caps.get(0)?;
                Some(DateMatch {
                    raw: full.as_str().to_string(),
                    day: caps[1].to_string(),
                    month: caps[3].to_string(),
                    year: caps[4].to_string(),
                    separator: caps[2].chars().next().unwrap_or('.'),
                    position: (full.start(), full.end()),
                })
            })
            .collect()
    }
}
