use chrono::NaiveDate;
use market_core::{round_to, Market, PriceSeries};
use price_store::PriceSnapshot;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::category::{top_members, ScreenCategory};
use crate::daily::{DayLists, TradingCalendar};
use crate::history::ChartHistory;
use crate::search::{search_symbols, SymbolMatch};

/// Trading sessions per calendar week
const SESSIONS_PER_WEEK: usize = 5;

/// Rows returned by the frequent-stock screen
const FREQUENT_LIMIT: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequentStock {
    pub rank: usize,
    pub ticker: String,
    pub name: String,
    /// Days the ticker made the top list within the period
    pub appearances: usize,
    pub period_sessions: usize,
    pub latest_traded_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullbackStock {
    pub rank: usize,
    pub ticker: String,
    pub name: String,
    pub change_rate: f64,
    pub close: f64,
    pub traded_value: f64,
    /// Session whose top list the ticker came from
    pub reference_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsecutiveRiseStock {
    pub rank: usize,
    pub ticker: String,
    pub name: String,
    pub change_rate: f64,
    pub close: f64,
    pub traded_value: f64,
    pub streak_days: usize,
}

/// Screens over one market snapshot
pub struct MarketScreener<'a> {
    snapshot: &'a PriceSnapshot,
    market: Market,
}

impl<'a> MarketScreener<'a> {
    pub fn new(market: Market, snapshot: &'a PriceSnapshot) -> Self {
        Self { snapshot, market }
    }

    pub fn market(&self) -> Market {
        self.market
    }

    pub fn calendar(&self) -> TradingCalendar {
        TradingCalendar::from_snapshot(self.snapshot)
    }

    pub fn day_lists(&self, date: NaiveDate) -> DayLists {
        DayLists::for_date(self.snapshot, self.market, date)
    }

    /// Tickers that made the daily top list most often over the last `weeks`.
    ///
    /// The period is the last `weeks * 5` trading dates up to `date`. Ranked by
    /// appearances, then by traded value on the latest of those dates.
    pub fn frequent(&self, date: NaiveDate, weeks: usize, category: ScreenCategory) -> Vec<FrequentStock> {
        let dates = self.snapshot.trading_dates();
        let upto = dates.partition_point(|d| *d <= date);
        let period = &dates[upto.saturating_sub(weeks.saturating_mul(SESSIONS_PER_WEEK))..upto];
        let Some(&latest) = period.last() else {
            return Vec::new();
        };

        // first-appearance order is the final tie-break
        let mut seen: HashMap<&str, usize> = HashMap::new();
        let mut tally: Vec<(&str, &str, usize)> = Vec::new();
        for &day in period {
            for rec in top_members(self.snapshot, day, category) {
                let idx = *seen.entry(rec.ticker.as_str()).or_insert_with(|| {
                    tally.push((rec.ticker.as_str(), rec.name.as_str(), 0));
                    tally.len() - 1
                });
                tally[idx].2 += 1;
            }
        }

        let latest_value = |ticker: &str| {
            self.snapshot
                .record(ticker, latest)
                .map(|r| r.traded_value)
                .unwrap_or(0.0)
        };
        let mut ranked: Vec<(&str, &str, usize, f64)> = tally
            .into_iter()
            .map(|(ticker, name, count)| (ticker, name, count, latest_value(ticker)))
            .collect();
        ranked.sort_by(|a, b| b.2.cmp(&a.2).then_with(|| b.3.total_cmp(&a.3)));
        ranked.truncate(FREQUENT_LIMIT);

        tracing::debug!(
            "[{}] frequent screen {} ({} weeks, {}): {} tickers over {} sessions",
            self.market.as_str().to_uppercase(),
            date,
            weeks,
            category.key(),
            ranked.len(),
            period.len()
        );

        ranked
            .into_iter()
            .enumerate()
            .map(|(i, (ticker, name, appearances, value))| FrequentStock {
                rank: i + 1,
                ticker: ticker.to_string(),
                name: name.to_string(),
                appearances,
                period_sessions: period.len(),
                latest_traded_value: value.trunc(),
            })
            .collect()
    }

    /// Members of the top list `days_ago` sessions earlier that fell on `date`
    pub fn pullback(&self, date: NaiveDate, days_ago: usize, category: ScreenCategory) -> Vec<PullbackStock> {
        let dates = self.snapshot.trading_dates();
        let Ok(idx) = dates.binary_search(&date) else {
            return Vec::new();
        };
        let Some(past_idx) = idx.checked_sub(days_ago) else {
            return Vec::new();
        };
        let reference_date = dates[past_idx];

        let members: HashSet<&str> = top_members(self.snapshot, reference_date, category)
            .into_iter()
            .map(|r| r.ticker.as_str())
            .collect();
        if members.is_empty() {
            return Vec::new();
        }

        let mut falling: Vec<_> = self
            .snapshot
            .records_on(date)
            .into_iter()
            .filter(|r| members.contains(r.ticker.as_str()) && r.change_rate < 0.0)
            .collect();
        falling.sort_by(|a, b| b.traded_value.total_cmp(&a.traded_value));

        falling
            .into_iter()
            .enumerate()
            .map(|(i, r)| PullbackStock {
                rank: i + 1,
                ticker: r.ticker.clone(),
                name: r.name.clone(),
                change_rate: round_to(r.change_rate, 2),
                close: self.market.round_price(r.close),
                traded_value: r.traded_value.trunc(),
                reference_date,
            })
            .collect()
    }

    /// Top-list members of the first of the last `days` sessions that rose on
    /// every one of those sessions
    pub fn consecutive_rise(
        &self,
        date: NaiveDate,
        days: usize,
        category: ScreenCategory,
    ) -> Vec<ConsecutiveRiseStock> {
        if days == 0 {
            return Vec::new();
        }
        let dates = self.snapshot.trading_dates();
        let Ok(idx) = dates.binary_search(&date) else {
            return Vec::new();
        };
        if idx + 1 < days {
            return Vec::new();
        }
        let window = &dates[idx + 1 - days..=idx];

        let mut candidates: HashSet<&str> = top_members(self.snapshot, window[0], category)
            .into_iter()
            .map(|r| r.ticker.as_str())
            .collect();
        for &day in window {
            let rising: HashSet<&str> = self
                .snapshot
                .records_on(day)
                .into_iter()
                .filter(|r| r.change_rate > 0.0)
                .map(|r| r.ticker.as_str())
                .collect();
            candidates.retain(|t| rising.contains(t));
            if candidates.is_empty() {
                return Vec::new();
            }
        }

        let mut streaks: Vec<_> = self
            .snapshot
            .records_on(date)
            .into_iter()
            .filter(|r| candidates.contains(r.ticker.as_str()))
            .collect();
        streaks.sort_by(|a, b| b.traded_value.total_cmp(&a.traded_value));

        streaks
            .into_iter()
            .enumerate()
            .map(|(i, r)| ConsecutiveRiseStock {
                rank: i + 1,
                ticker: r.ticker.clone(),
                name: r.name.clone(),
                change_rate: round_to(r.change_rate, 2),
                close: self.market.round_price(r.close),
                traded_value: r.traded_value.trunc(),
                streak_days: days,
            })
            .collect()
    }

    pub fn search(&self, query: &str, limit: usize) -> Vec<SymbolMatch> {
        search_symbols(self.snapshot.listings(), query, limit)
    }

    pub fn history(&self, ticker: &str, days: usize, end_date: Option<NaiveDate>) -> ChartHistory {
        match self.snapshot.series(ticker) {
            Some(series) => ChartHistory::build(self.market, series, days, end_date),
            None => ChartHistory::empty(end_date),
        }
    }
}
