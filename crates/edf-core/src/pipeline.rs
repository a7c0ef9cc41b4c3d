//! Single evaluation engine: text in, classified record out.

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::dates::{
    CalendarPolicy, DateMatch, DateMatcher, DateNormalizer, DateSelector, DmyDateMatcher,
    ReferenceYear, Selection, SelectionPolicy, normalize_text,
};
use crate::error::ExtractionError;
use crate::models::case::{CaseRecord, Status};
use crate::models::config::EdfConfig;
use crate::validation::{GroundTruth, ValidationEngine};

/// Intermediate result of running the extraction stages on one text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    /// Raw matches in order of appearance.
    pub matches: Vec<DateMatch>,
    /// One normalized date per match.
    pub dates: Vec<NaiveDate>,
    /// The document's result under the configured policy.
    pub selection: Selection,
}

/// Date evaluation pipeline parameterized by a selection policy.
pub struct Pipeline {
    matcher: Box<dyn DateMatcher>,
    normalizer: DateNormalizer,
    selector: DateSelector,
    validator: ValidationEngine,
}

impl Pipeline {
    /// Create a pipeline with the day-month-year matcher and strict calendar.
    pub fn new(reference_year: ReferenceYear, policy: SelectionPolicy) -> Self {
        Self {
            matcher: Box::new(DmyDateMatcher::new()),
            normalizer: DateNormalizer::new(reference_year),
            selector: DateSelector::new(policy),
            validator: ValidationEngine::new(policy),
        }
    }

    /// Create a pipeline from configuration.
    pub fn from_config(config: &EdfConfig) -> Self {
        Self::new(config.extraction.reference_year(), config.selection.policy)
            .with_calendar_policy(config.extraction.calendar)
    }

    /// Replace the date matcher.
    pub fn with_matcher(mut self, matcher: impl DateMatcher + 'static) -> Self {
        self.matcher = Box::new(matcher);
        self
    }

    /// Set the calendar policy.
    pub fn with_calendar_policy(mut self, calendar: CalendarPolicy) -> Self {
        self.normalizer = self.normalizer.with_calendar_policy(calendar);
        self
    }

    pub fn policy(&self) -> SelectionPolicy {
        self.selector.policy()
    }

    pub fn reference_year(&self) -> ReferenceYear {
        self.normalizer.reference_year()
    }

    pub fn calendar_policy(&self) -> CalendarPolicy {
        self.normalizer.calendar_policy()
    }

    /// Run normalization, matching, date normalization and selection.
    pub fn extract(&self, text: &str) -> Result<Extraction, ExtractionError> {
        let clean = normalize_text(text);
        let matches = self.matcher.find_all(&clean);
        let dates = self.normalizer.normalize_all(&matches)?;
        let selection = self.selector.select(&dates);

        Ok(Extraction {
            matches,
            dates,
            selection,
        })
    }

    /// Evaluate one document's text against the ground truth.
    ///
    /// Never fails: extraction and lookup errors end up on the record with
    /// status `Undefined`.
    pub fn evaluate(&self, identifier: &str, text: &str, truth: &GroundTruth) -> CaseRecord {
        let expected = truth.lookup(identifier);

        let extraction = match self.extract(text) {
            Ok(extraction) => extraction,
            Err(e) => {
                warn!("{}: {}", identifier, e);
                return CaseRecord::failed(identifier, expected.ok(), e);
            }
        };

        debug!(
            "{}: {} matches, selection {:?}",
            identifier,
            extraction.matches.len(),
            extraction.selection
        );

        let (status, error) = match (&extraction.selection, &expected) {
            (Selection::Empty, _) => (Status::Undefined, None),
            (_, Err(e)) => {
                warn!("{}", e);
                (Status::Undefined, Some(e.to_string()))
            }
            (selection, Ok(record)) => (self.validator.validate(selection, record), None),
        };

        CaseRecord::new(
            identifier.to_string(),
            extraction.dates,
            extraction.selection,
            expected.ok(),
            status,
            error,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::RejectReason;
    use crate::models::case::ExpectedRecord;
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn pipeline(policy: SelectionPolicy) -> Pipeline {
        Pipeline::new(ReferenceYear::new(2025).unwrap(), policy)
    }

    fn truth(records: Vec<(&str, Vec<NaiveDate>)>) -> GroundTruth {
        GroundTruth::from_records(
            records
                .into_iter()
                .map(|(id, dates)| ExpectedRecord::new(id, dates))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_single_latest_end_to_end() {
        let truth = truth(vec![("milk.jpg", vec![date(2024, 6, 1)])]);
        let text = "МОЛОКО 3,2%\nИзготовлено: 01.01.2024\nГоден до: 01.06.2024\n";

        let record = pipeline(SelectionPolicy::SingleLatest).evaluate("milk.jpg", text, &truth);

        assert_eq!(record.status(), Status::Valid);
        assert_eq!(record.extracted_dates(), &[date(2024, 6, 1)]);
        assert_eq!(record.candidates(), &[date(2024, 1, 1), date(2024, 6, 1)]);
        assert_eq!(record.error(), None);
    }

    #[test]
    fn test_single_latest_mismatch() {
        let truth = truth(vec![("milk.jpg", vec![date(2024, 6, 2)])]);
        let record =
            pipeline(SelectionPolicy::SingleLatest).evaluate("milk.jpg", "01.06.2024", &truth);
        assert_eq!(record.status(), Status::Invalid);
    }

    #[test]
    fn test_pair_end_to_end() {
        let text = "issued 01.01.2024\nvalid until 01/06/2024";
        let pipeline = pipeline(SelectionPolicy::Pair);

        let valid = truth(vec![("doc.png", vec![date(2024, 1, 1), date(2024, 6, 1)])]);
        assert_eq!(pipeline.evaluate("doc.png", text, &valid).status(), Status::Valid);

        let invalid = truth(vec![("doc.png", vec![date(2024, 1, 1), date(2024, 6, 2)])]);
        assert_eq!(pipeline.evaluate("doc.png", text, &invalid).status(), Status::Invalid);
    }

    #[test]
    fn test_pair_with_three_dates_is_invalid() {
        let truth = truth(vec![("doc.png", vec![date(2024, 1, 1), date(2024, 6, 1)])]);
        let record = pipeline(SelectionPolicy::Pair).evaluate(
            "doc.png",
            "01.01.2024 01.06.2024 01.07.2024",
            &truth,
        );

        assert_eq!(record.status(), Status::Invalid);
        assert_eq!(
            record.selection(),
            &Selection::Rejected { reason: RejectReason::AmbiguousPair }
        );
        assert_eq!(record.candidates().len(), 3);
        assert!(record.extracted_dates().is_empty());
    }

    #[test]
    fn test_pair_with_one_date_is_invalid() {
        let truth = truth(vec![("doc.png", vec![date(2024, 1, 1), date(2024, 6, 1)])]);
        let record =
            pipeline(SelectionPolicy::Pair).evaluate("doc.png", "EXP 01.06.2024", &truth);

        assert_eq!(record.status(), Status::Invalid);
        assert_eq!(record.extracted_dates(), &[date(2024, 6, 1)]);
        assert_eq!(record.candidates(), &[date(2024, 6, 1)]);
    }

    #[test]
    fn test_date_glued_to_cyrillic_label() {
        let extraction = pipeline(SelectionPolicy::SingleLatest)
            .extract("ГОДЕНДО01.06.2024")
            .unwrap();

        assert_eq!(extraction.matches.len(), 1);
        assert_eq!(extraction.matches[0].raw, "01.06.2024");
        assert_eq!(extraction.selection, Selection::Single { date: date(2024, 6, 1) });
    }

    #[test]
    fn test_zero_matches_is_undefined_regardless_of_truth() {
        let truth = truth(vec![("a.jpg", vec![date(2024, 6, 1)])]);
        for policy in [SelectionPolicy::SingleLatest, SelectionPolicy::Pair] {
            let pipeline = pipeline(policy);
            assert_eq!(
                pipeline.evaluate("a.jpg", "no dates here", &truth).status(),
                Status::Undefined
            );
            assert_eq!(pipeline.evaluate("missing.jpg", "", &truth).status(), Status::Undefined);
        }
    }

    #[test]
    fn test_missing_ground_truth_is_reported() {
        let truth = truth(vec![("a.jpg", vec![date(2024, 6, 1)])]);
        let record =
            pipeline(SelectionPolicy::SingleLatest).evaluate("b.jpg", "01.06.2024", &truth);

        assert_eq!(record.status(), Status::Undefined);
        assert_eq!(record.extracted_dates(), &[date(2024, 6, 1)]);
        assert_eq!(record.expected_dates(), None);
        assert_eq!(record.error(), Some("no ground truth record for b.jpg"));
    }

    #[test]
    fn test_construction_error_is_isolated() {
        let truth = truth(vec![("a.jpg", vec![date(2024, 5, 1)])]);

        let strict =
            pipeline(SelectionPolicy::SingleLatest).evaluate("a.jpg", "31.04.2024", &truth);
        assert_eq!(strict.status(), Status::Undefined);
        assert!(strict.error().unwrap().contains("31.04.2024"));

        let rollover = pipeline(SelectionPolicy::SingleLatest)
            .with_calendar_policy(CalendarPolicy::Rollover)
            .evaluate("a.jpg", "31.04.2024", &truth);
        assert_eq!(rollover.status(), Status::Valid);
    }

    #[test]
    fn test_two_digit_year_uses_reference_year() {
        let truth = truth(vec![("a.jpg", vec![date(2025, 2, 1)])]);
        let record =
            pipeline(SelectionPolicy::SingleLatest).evaluate("a.jpg", "до 01.02.25", &truth);
        assert_eq!(record.status(), Status::Valid);
    }

    #[test]
    fn test_custom_matcher() {
        struct FixedMatcher;

        impl DateMatcher for FixedMatcher {
            fn find_all(&self, _text: &str) -> Vec<DateMatch> {
                vec![DateMatch {
                    raw: "07.07.2027".to_string(),
                    day: "07".to_string(),
                    month: "07".to_string(),
                    year: "2027".to_string(),
                    separator: '.',
                    position: (0, 10),
                }]
            }
        }

        let pipeline = pipeline(SelectionPolicy::SingleLatest).with_matcher(FixedMatcher);
        let extraction = pipeline.extract("anything").unwrap();
        assert_eq!(extraction.selection, Selection::Single { date: date(2027, 7, 7) });
    }

    #[test]
    fn test_evaluation_is_deterministic() {
        let truth = truth(vec![
            ("a.jpg", vec![date(2024, 6, 1)]),
            ("b.jpg", vec![date(2024, 6, 1)]),
        ]);
        let docs = [("a.jpg", "01.06.2024"), ("b.jpg", "02.06.24 x 01.01.24"), ("c.jpg", "")];
        let pipeline = pipeline(SelectionPolicy::SingleLatest);

        let run = || {
            docs.iter()
                .map(|(id, text)| pipeline.evaluate(id, text, &truth))
                .collect::<Vec<_>>()
        };
        let first = run();
        for _ in 0..5 {
            assert_eq!(run(), first);
        }
    }
}
