//! Single-stage predicate evaluation

use market_core::{percent_change, BaseField, CompareField, DailyPriceRecord, PriceSeries};

use crate::models::{Direction, PredicateStage, StageCondition};

/// The anchor session of a (ticker, date) pair plus its neighbours.
///
/// Resolved once per pair and shared by every stage so that a scan never looks
/// up the same neighbour twice.
#[derive(Debug, Clone, Copy)]
pub struct DayWindow<'a> {
    pub previous: Option<&'a DailyPriceRecord>,
    pub current: &'a DailyPriceRecord,
    pub next: Option<&'a DailyPriceRecord>,
}

impl<'a> DayWindow<'a> {
    /// Build the window for an anchor record that is already in hand
    pub fn around<S: PriceSeries + ?Sized>(
        series: &'a S,
        current: &'a DailyPriceRecord,
        with_previous: bool,
        with_next: bool,
    ) -> Self {
        let (ticker, date) = (current.ticker.as_str(), current.date);
        Self {
            previous: if with_previous { series.previous_record(ticker, date) } else { None },
            current,
            next: if with_next { series.next_record(ticker, date) } else { None },
        }
    }

    pub fn base_value(&self, field: BaseField) -> Option<f64> {
        match field {
            BaseField::PrevClose => self.previous.map(|r| r.close),
            BaseField::Open => Some(self.current.open),
            BaseField::Close => Some(self.current.close),
        }
    }

    pub fn compare_value(&self, field: CompareField) -> Option<f64> {
        match field {
            CompareField::Open => Some(self.current.open),
            CompareField::Close => Some(self.current.close),
            CompareField::NextOpen => self.next.map(|r| r.open),
            CompareField::NextClose => self.next.map(|r| r.close),
        }
    }
}

/// Result of evaluating one stage against one window
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StageOutcome {
    /// Stage not configured; acts as a pass
    Skipped,
    Passed { base: f64, compare: f64, rate: f64 },
    Rejected { rate: f64 },
    /// A required price is missing or the base cannot divide
    Unavailable,
}

impl StageOutcome {
    pub fn passes(&self) -> bool {
        matches!(self, StageOutcome::Skipped | StageOutcome::Passed { .. })
    }

    /// Percent move measured by the stage, when it got that far
    pub fn rate(&self) -> Option<f64> {
        match self {
            StageOutcome::Passed { rate, .. } | StageOutcome::Rejected { rate } => Some(*rate),
            _ => None,
        }
    }
}

/// Decides whether one window satisfies one stage
pub struct PredicateEvaluator;

impl PredicateEvaluator {
    pub fn evaluate(stage: &PredicateStage, window: &DayWindow<'_>) -> StageOutcome {
        let (base_field, compare_field, condition) =
            match (stage.base, stage.compare, stage.condition) {
                (Some(b), Some(c), Some(cond)) => (b, c, cond),
                _ => return StageOutcome::Skipped,
            };

        let (base, compare) = match (
            window.base_value(base_field),
            window.compare_value(compare_field),
        ) {
            (Some(b), Some(c)) => (b, c),
            _ => return StageOutcome::Unavailable,
        };

        let rate = match percent_change(base, compare) {
            Some(r) => r,
            None => return StageOutcome::Unavailable,
        };

        let passed = match condition {
            StageCondition::RateRange { min_rate, max_rate } => min_rate <= rate && rate <= max_rate,
            StageCondition::Direction(Direction::Up) => compare > base,
            StageCondition::Direction(Direction::Down) => compare < base,
        };

        if passed {
            StageOutcome::Passed { base, compare, rate }
        } else {
            StageOutcome::Rejected { rate }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StageRole;
    use chrono::NaiveDate;

    fn record(open: f64, close: f64) -> DailyPriceRecord {
        DailyPriceRecord {
            date: NaiveDate::from_ymd_opt(2023, 1, 2).unwrap(),
            ticker: "TEST".into(),
            name: "Test".into(),
            open,
            high: open.max(close),
            low: open.min(close),
            close,
            volume: None,
            traded_value: 1.0,
            change_rate: 0.0,
            ma240: None,
        }
    }

    #[test]
    fn test_gap_up_within_range() {
        let prev = record(99.0, 100.0);
        let today = record(105.0, 104.0);
        let window = DayWindow { previous: Some(&prev), current: &today, next: None };

        let stage = PredicateStage::primary(BaseField::PrevClose, CompareField::Open, 3.0, 10.0);
        let outcome = PredicateEvaluator::evaluate(&stage, &window);
        assert_eq!(outcome, StageOutcome::Passed { base: 100.0, compare: 105.0, rate: 5.0 });
    }

    #[test]
    fn test_missing_previous_fails_closed() {
        let today = record(105.0, 104.0);
        let window = DayWindow { previous: None, current: &today, next: None };

        let stage = PredicateStage::primary(BaseField::PrevClose, CompareField::Open, -100.0, 100.0);
        assert_eq!(PredicateEvaluator::evaluate(&stage, &window), StageOutcome::Unavailable);
    }

    #[test]
    fn test_zero_base_fails() {
        let today = record(0.0, 10.0);
        let window = DayWindow { previous: None, current: &today, next: None };

        let stage = PredicateStage::primary(BaseField::Open, CompareField::Close, -1e9, 1e9);
        assert!(!PredicateEvaluator::evaluate(&stage, &window).passes());
    }

    #[test]
    fn test_direction_is_strict() {
        let today = record(100.0, 100.0);
        let window = DayWindow { previous: None, current: &today, next: None };

        for direction in [Direction::Up, Direction::Down] {
            let stage = PredicateStage::directional(
                StageRole::Extra,
                Some(BaseField::Open),
                Some(CompareField::Close),
                Some(direction),
            );
            assert_eq!(
                PredicateEvaluator::evaluate(&stage, &window),
                StageOutcome::Rejected { rate: 0.0 }
            );
        }
    }

    #[test]
    fn test_partially_configured_stage_is_skipped() {
        let today = record(100.0, 90.0);
        let window = DayWindow { previous: None, current: &today, next: None };

        let stage = PredicateStage::directional(
            StageRole::Detail,
            Some(BaseField::Open),
            None,
            Some(Direction::Up),
        );
        assert_eq!(PredicateEvaluator::evaluate(&stage, &window), StageOutcome::Skipped);
        assert!(StageOutcome::Skipped.passes());
    }

    #[test]
    fn test_next_session_fields() {
        let today = record(100.0, 102.0);
        let tomorrow = record(101.0, 99.0);
        let window = DayWindow { previous: None, current: &today, next: Some(&tomorrow) };

        let stage = PredicateStage::directional(
            StageRole::Detail,
            Some(BaseField::Close),
            Some(CompareField::NextClose),
            Some(Direction::Down),
        );
        assert!(PredicateEvaluator::evaluate(&stage, &window).passes());

        let no_next = DayWindow { next: None, ..window };
        assert_eq!(PredicateEvaluator::evaluate(&stage, &no_next), StageOutcome::Unavailable);
    }
}
