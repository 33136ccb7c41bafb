//! Result Ranking Module
//!
//! Re-orders and narrows a finished scan without running it again.

use market_core::PriceBand;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::models::{GapResult, MaPositionFilter, SortColumn, SortDirection};

/// Presentation options applied over a scan result
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RankOptions {
    pub sort_by: SortColumn,
    pub direction: SortDirection,
    pub price_band: PriceBand,
    pub ma_filter: MaPositionFilter,
}

/// Filters then sorts gap results
#[derive(Debug, Default)]
pub struct ResultRanker {
    options: RankOptions,
}

impl ResultRanker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: RankOptions) -> Self {
        Self { options }
    }

    /// Filtered and sorted copy of `results`
    pub fn rank(&self, results: &[GapResult]) -> Vec<GapResult> {
        let mut ranked = self.filter(results);
        self.sort(&mut ranked);
        ranked
    }

    /// Keep rows inside the price band and MA bucket
    pub fn filter(&self, results: &[GapResult]) -> Vec<GapResult> {
        results
            .iter()
            .filter(|r| self.options.price_band.contains(r.close))
            .filter(|r| self.options.ma_filter.matches(r.ma_position))
            .cloned()
            .collect()
    }

    /// Stable sort on the chosen column.
    ///
    /// Date ties always fall back to traded value descending, whatever the
    /// direction; other columns keep the incoming order on ties.
    pub fn sort(&self, results: &mut [GapResult]) {
        let descending = self.options.direction == SortDirection::Desc;
        let directed = |ord: Ordering| if descending { ord.reverse() } else { ord };

        match self.options.sort_by {
            SortColumn::Date => results.sort_by(|a, b| {
                directed(a.date.cmp(&b.date))
                    .then_with(|| b.traded_value.total_cmp(&a.traded_value))
            }),
            SortColumn::Ticker => results.sort_by(|a, b| directed(locale_cmp(&a.ticker, &b.ticker))),
            SortColumn::Name => results.sort_by(|a, b| directed(locale_cmp(&a.name, &b.name))),
            SortColumn::Close => results.sort_by(|a, b| directed(a.close.total_cmp(&b.close))),
            SortColumn::ChangeRate => {
                results.sort_by(|a, b| directed(a.change_rate.total_cmp(&b.change_rate)))
            }
            SortColumn::TradedValue => {
                results.sort_by(|a, b| directed(a.traded_value.total_cmp(&b.traded_value)))
            }
        }
    }
}

/// Case-folded comparison with the raw strings as tie-break
fn locale_cmp(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MaPosition;
    use chrono::NaiveDate;

    fn create_test_result(ticker: &str, day: u32, close: f64, traded_value: f64) -> GapResult {
        GapResult {
            date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            ticker: ticker.to_string(),
            name: format!("{} Inc", ticker),
            close,
            change_rate: close / 10.0,
            traded_value,
            ma240: None,
            ma_position: None,
        }
    }

    #[test]
    fn test_locale_cmp_folds_case() {
        assert_eq!(locale_cmp("apple", "Banana"), Ordering::Less);
        assert_eq!(locale_cmp("Apple", "apple"), Ordering::Less);
        assert_eq!(locale_cmp("same", "same"), Ordering::Equal);
    }

    #[test]
    fn test_name_sort_ignores_case() {
        let mut rows = vec![
            create_test_result("b", 1, 1.0, 1.0),
            create_test_result("A", 1, 1.0, 1.0),
            create_test_result("c", 1, 1.0, 1.0),
        ];
        ResultRanker::with_options(RankOptions {
            sort_by: SortColumn::Ticker,
            ..Default::default()
        })
        .sort(&mut rows);

        let tickers: Vec<&str> = rows.iter().map(|r| r.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["A", "b", "c"]);
    }

    #[test]
    fn test_filters_before_sorting() {
        let mut above = create_test_result("HIGH", 1, 12.0, 1.0);
        above.ma_position = Some(MaPosition::Above);
        let mut below = create_test_result("HIGH2", 1, 15.0, 1.0);
        below.ma_position = Some(MaPosition::Below);
        let rows = vec![above, below, create_test_result("LOW", 1, 3.0, 1.0)];

        let ranker = ResultRanker::with_options(RankOptions {
            price_band: PriceBand::High,
            ma_filter: MaPositionFilter::Above,
            ..Default::default()
        });
        let ranked = ranker.rank(&rows);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].ticker, "HIGH");

        let unknown = ResultRanker::with_options(RankOptions {
            ma_filter: MaPositionFilter::Unknown,
            ..Default::default()
        });
        assert_eq!(unknown.rank(&rows)[0].ticker, "LOW");
    }
}
