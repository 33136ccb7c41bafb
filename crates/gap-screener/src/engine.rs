//! Gap Scan Engine
//!
//! Walks every trading date of a query range and keeps the (ticker, date)
//! pairs that pass the primary stage and any configured confirmation stages.

use chrono::NaiveDate;
use market_core::{MarketError, PriceSeries};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::cancel::CancelFlag;
use crate::classifier::MaPositionClassifier;
use crate::models::{GapQuery, GapResult, PredicateStage, StageRole};
use crate::predicate::{DayWindow, PredicateEvaluator};

/// Outcome of one scan
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GapScan {
    /// Matches ordered by date ascending, then traded value descending
    pub results: Vec<GapResult>,
    pub dates_scanned: usize,
    /// (ticker, date) pairs that reached stage evaluation
    pub pairs_evaluated: usize,
}

/// Rows of one date plus the number of pairs looked at
type DateBatch = (Vec<GapResult>, usize);

pub struct GapScanEngine<'a, S: PriceSeries + ?Sized> {
    series: &'a S,
    classifier: MaPositionClassifier,
}

impl<'a, S: PriceSeries + ?Sized> GapScanEngine<'a, S> {
    pub fn new(series: &'a S) -> Self {
        Self {
            series,
            classifier: MaPositionClassifier::new(),
        }
    }

    pub fn scan(&self, query: &GapQuery) -> Result<GapScan, MarketError> {
        self.scan_with_cancel(query, &CancelFlag::new())
    }

    /// Run the scan, checking `cancel` before every date.
    ///
    /// A cancelled scan returns [`MarketError::Cancelled`] and no partial rows.
    pub fn scan_with_cancel(
        &self,
        query: &GapQuery,
        cancel: &CancelFlag,
    ) -> Result<GapScan, MarketError> {
        query.validate()?;

        let started = Instant::now();
        let dates = self.series.dates_in_range(query.start_date, query.end_date);
        let stages: Vec<&PredicateStage> = query.configured_stages().collect();
        let with_previous = stages.iter().any(|s| s.needs_previous_session());
        let with_next = stages.iter().any(|s| s.needs_next_session());
        let filter = query.ticker_filter.as_deref().map(str::to_uppercase);

        tracing::info!(
            "🔍 Gap scan {} ~ {}: {} sessions, {} active stages",
            query.start_date,
            query.end_date,
            dates.len(),
            stages.len()
        );

        let batches: Vec<Option<DateBatch>> = dates
            .par_iter()
            .map(|&date| {
                if cancel.is_cancelled() {
                    return None;
                }
                Some(self.scan_date(date, &stages, filter.as_deref(), with_previous, with_next))
            })
            .collect();

        if cancel.is_cancelled() || batches.iter().any(Option::is_none) {
            tracing::warn!(
                "Gap scan {} ~ {} cancelled after {:.2}s",
                query.start_date,
                query.end_date,
                started.elapsed().as_secs_f64()
            );
            return Err(MarketError::Cancelled);
        }

        let mut results = Vec::new();
        let mut pairs_evaluated = 0;
        for (rows, evaluated) in batches.into_iter().flatten() {
            results.extend(rows);
            pairs_evaluated += evaluated;
        }
        self.classifier.annotate(&mut results);

        tracing::info!(
            "✅ Gap scan complete: {} matches from {} pairs in {:.2}s",
            results.len(),
            pairs_evaluated,
            started.elapsed().as_secs_f64()
        );

        Ok(GapScan {
            results,
            dates_scanned: dates.len(),
            pairs_evaluated,
        })
    }

    fn scan_date(
        &self,
        date: NaiveDate,
        stages: &[&PredicateStage],
        filter: Option<&str>,
        with_previous: bool,
        with_next: bool,
    ) -> DateBatch {
        let mut rows = Vec::new();
        let mut evaluated = 0;

        for ticker in self.series.tickers_on(date) {
            let Some(current) = self.series.record(ticker, date) else {
                continue;
            };
            if let Some(needle) = filter {
                if !current.ticker.to_uppercase().contains(needle)
                    && !current.name.to_uppercase().contains(needle)
                {
                    continue;
                }
            }

            evaluated += 1;
            let window = DayWindow::around(self.series, current, with_previous, with_next);

            let mut primary_rate = None;
            let passed = stages.iter().all(|stage| {
                let outcome = PredicateEvaluator::evaluate(stage, &window);
                if stage.role == StageRole::Primary {
                    primary_rate = outcome.rate();
                }
                outcome.passes()
            });

            if let (true, Some(change_rate)) = (passed, primary_rate) {
                rows.push(GapResult {
                    date,
                    ticker: current.ticker.clone(),
                    name: current.name.clone(),
                    close: current.close,
                    change_rate,
                    traded_value: current.traded_value,
                    ma240: current.ma240,
                    ma_position: None,
                });
            }
        }

        rows.sort_by(|a, b| b.traded_value.total_cmp(&a.traded_value));
        (rows, evaluated)
    }
}
