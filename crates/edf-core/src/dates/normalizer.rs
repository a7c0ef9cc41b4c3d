//! Conversion of raw date matches into calendar dates.

use std::fmt;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{EdfError, ExtractionError};

use super::matcher::DateMatch;

/// Year used to expand 2-digit year fields.
///
/// Always a 4-digit year. The first two digits are prefixed to any 2-digit
/// year field, so with 2025 both `25` and `99` land in the 2000s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct ReferenceYear(i32);

impl ReferenceYear {
    pub fn new(year: i32) -> Result<Self, EdfError> {
        if (1000..=9999).contains(&year) {
            Ok(Self(year))
        } else {
            Err(EdfError::Config(format!(
                "reference year must have 4 digits, got {}",
                year
            )))
        }
    }

    /// The current year of the local clock.
    pub fn current() -> Self {
        use chrono::Datelike;
        Self(chrono::Local::now().year())
    }

    pub fn year(self) -> i32 {
        self.0
    }

    /// Leading two digits of the year.
    pub fn century_prefix(self) -> String {
        self.0.to_string()[..2].to_string()
    }
}

impl TryFrom<i32> for ReferenceYear {
    type Error = EdfError;

    fn try_from(year: i32) -> Result<Self, Self::Error> {
        Self::new(year)
    }
}

impl From<ReferenceYear> for i32 {
    fn from(year: ReferenceYear) -> Self {
        year.0
    }
}

impl fmt::Display for ReferenceYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How day/month combinations that do not exist are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalendarPolicy {
    /// Reject impossible dates such as 31.04 with a construction error.
    #[default]
    Strict,
    /// Roll overflowing days into the next month (31.04 becomes 01.05).
    Rollover,
}

impl fmt::Display for CalendarPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalendarPolicy::Strict => write!(f, "strict"),
            CalendarPolicy::Rollover => write!(f, "rollover"),
        }
    }
}

impl std::str::FromStr for CalendarPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "strict" => Ok(CalendarPolicy::Strict),
            "rollover" => Ok(CalendarPolicy::Rollover),
            other => Err(format!(
                "unknown calendar policy {:?} (expected strict or rollover)",
                other
            )),
        }
    }
}

/// Converts raw matches into dates at UTC midnight.
#[derive(Debug, Clone, Copy)]
pub struct DateNormalizer {
    reference_year: ReferenceYear,
    calendar: CalendarPolicy,
}

impl DateNormalizer {
    /// Create a normalizer with the strict calendar policy.
    pub fn new(reference_year: ReferenceYear) -> Self {
        Self {
            reference_year,
            calendar: CalendarPolicy::Strict,
        }
    }

    /// Set the calendar policy.
    pub fn with_calendar_policy(mut self, calendar: CalendarPolicy) -> Self {
        self.calendar = calendar;
        self
    }

    pub fn reference_year(&self) -> ReferenceYear {
        self.reference_year
    }

    pub fn calendar_policy(&self) -> CalendarPolicy {
        self.calendar
    }

    /// Normalize every match, preserving order.
    ///
    /// Stops at the first failing match; the error belongs to the whole
    /// document.
    pub fn normalize_all(&self, matches: &[DateMatch]) -> Result<Vec<NaiveDate>, ExtractionError> {
        matches.iter().map(|m| self.normalize(&m.raw)).collect()
    }

    /// Normalize one raw match such as `01.02.2024` or `01/02/24`.
    pub fn normalize(&self, raw: &str) -> Result<NaiveDate, ExtractionError> {
        let unified = raw.replace('/', ".");
        let pieces: Vec<&str> = unified.split('.').collect();
        let [day, month, year] = pieces.as_slice() else {
            return Err(ExtractionError::MatchParse {
                raw: raw.to_string(),
                field: "date".to_string(),
            });
        };

        let year = if year.len() == 2 {
            format!("{}{}", self.reference_year.century_prefix(), year)
        } else {
            (*year).to_string()
        };

        let day: u32 = parse_field(raw, "day", day)?;
        let month: u32 = parse_field(raw, "month", month)?;
        let year: i32 = parse_field(raw, "year", &year)?;

        let date = match self.calendar {
            CalendarPolicy::Strict => NaiveDate::from_ymd_opt(year, month, day),
            CalendarPolicy::Rollover => rollover_date(year, month, day),
        };

        trace!("Normalized {:?} to {:?}", raw, date);

        date.ok_or_else(|| ExtractionError::Construction {
            raw: raw.to_string(),
            year,
            month,
            day,
        })
    }
}

fn parse_field<T: std::str::FromStr>(
    raw: &str,
    field: &str,
    value: &str,
) -> Result<T, ExtractionError> {
    // Leading signs parse as integers but never belong to a date field
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ExtractionError::MatchParse {
            raw: raw.to_string(),
            field: field.to_string(),
        });
    }
    value.parse().map_err(|_| ExtractionError::MatchParse {
        raw: raw.to_string(),
        field: field.to_string(),
    })
}

/// Build a date from the first of the month plus `day - 1` days.
fn rollover_date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    if day == 0 {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, 1)?.checked_add_days(Days::new(u64::from(day - 1)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn normalizer(year: i32) -> DateNormalizer {
        DateNormalizer::new(ReferenceYear::new(year).unwrap())
    }

    #[test]
    fn test_four_digit_year() {
        let n = normalizer(2025);
        assert_eq!(n.normalize("15.01.2024").unwrap(), date(2024, 1, 15));
        assert_eq!(n.normalize("15/01/2024").unwrap(), date(2024, 1, 15));
        assert_eq!(n.normalize("01/12.1999").unwrap(), date(1999, 12, 1));
    }

    #[test]
    fn test_two_digit_year_uses_reference_prefix() {
        let n = normalizer(2025);
        assert_eq!(n.normalize("01.02.25").unwrap(), date(2025, 2, 1));
        assert_eq!(n.normalize("01.02.99").unwrap(), date(2099, 2, 1));
        assert_eq!(n.normalize("01/02/00").unwrap(), date(2000, 2, 1));
    }

    #[test]
    fn test_two_digit_year_across_centuries() {
        assert_eq!(normalizer(1999).normalize("01.02.25").unwrap(), date(1925, 2, 1));
        assert_eq!(normalizer(2100).normalize("01.02.25").unwrap(), date(2125, 2, 1));
    }

    #[test]
    fn test_reference_year_must_have_four_digits() {
        assert!(ReferenceYear::new(999).is_err());
        assert!(ReferenceYear::new(10000).is_err());
        assert_eq!(ReferenceYear::new(2025).unwrap().century_prefix(), "20");
    }

    #[test]
    fn test_reference_year_deserializes_with_validation() {
        let year: ReferenceYear = serde_json::from_str("2024").unwrap();
        assert_eq!(year.year(), 2024);
        assert!(serde_json::from_str::<ReferenceYear>("24").is_err());
    }

    #[test]
    fn test_malformed_match_is_parse_error() {
        let n = normalizer(2025);
        assert_eq!(
            n.normalize("01.02"),
            Err(ExtractionError::MatchParse {
                raw: "01.02".to_string(),
                field: "date".to_string(),
            })
        );
        assert_eq!(
            n.normalize("0a.02.2024"),
            Err(ExtractionError::MatchParse {
                raw: "0a.02.2024".to_string(),
                field: "day".to_string(),
            })
        );
        assert!(n.normalize("01.+2.2024").is_err());
        assert!(n.normalize("01..2024").is_err());
    }

    #[test]
    fn test_strict_policy_boundaries() {
        let n = normalizer(2025);
        assert_eq!(n.normalize("30.04.2024").unwrap(), date(2024, 4, 30));
        assert_eq!(n.normalize("29.02.2024").unwrap(), date(2024, 2, 29));
        assert_eq!(
            n.normalize("31.04.2024"),
            Err(ExtractionError::Construction {
                raw: "31.04.2024".to_string(),
                year: 2024,
                month: 4,
                day: 31,
            })
        );
        assert!(n.normalize("29.02.2023").is_err());
        assert!(n.normalize("31.12.2024").is_ok());
    }

    #[test]
    fn test_rollover_policy_boundaries() {
        let n = normalizer(2025).with_calendar_policy(CalendarPolicy::Rollover);
        assert_eq!(n.normalize("30.04.2024").unwrap(), date(2024, 4, 30));
        assert_eq!(n.normalize("31.04.2024").unwrap(), date(2024, 5, 1));
        assert_eq!(n.normalize("29.02.2023").unwrap(), date(2023, 3, 1));
        assert_eq!(n.normalize("31.02.2024").unwrap(), date(2024, 3, 2));
        assert_eq!(n.normalize("31.12.2024").unwrap(), date(2024, 12, 31));
    }

    #[test]
    fn test_calendar_policy_parsing() {
        assert_eq!("Rollover".parse::<CalendarPolicy>().unwrap(), CalendarPolicy::Rollover);
        assert!("lenient".parse::<CalendarPolicy>().is_err());
    }

    #[test]
    fn test_normalize_all_preserves_order() {
        use crate::dates::matcher::{DateMatcher, DmyDateMatcher};

        let matches = DmyDateMatcher::new().find_all("01.06.2024 x 01.01.24");
        let dates = normalizer(2025).normalize_all(&matches).unwrap();
        assert_eq!(dates, vec![date(2024, 6, 1), date(2024, 1, 1)]);
    }

    #[test]
    fn test_normalize_all_fails_on_first_bad_match() {
        use crate::dates::matcher::{DateMatcher, DmyDateMatcher};

        let matches = DmyDateMatcher::new().find_all("01.06.2024 31.04.2024");
        assert!(matches!(
            normalizer(2025).normalize_all(&matches),
            Err(ExtractionError::Construction { day: 31, month: 4, .. })
        ));
    }
}
