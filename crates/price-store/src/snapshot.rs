use chrono::NaiveDate;
use market_core::moving_average::rolling_sma;
use market_core::{percent_change, DailyPriceRecord, Market, PriceSeries};
use std::collections::{BTreeMap, HashMap};

/// Sessions in the long-term moving average
pub const MA240_PERIOD: usize = 240;

/// Immutable, indexed view of one market's daily records
#[derive(Debug, Default)]
pub struct PriceSnapshot {
    market: Option<Market>,
    version: u64,
    /// Per-ticker records sorted by date
    series: BTreeMap<String, Vec<DailyPriceRecord>>,
    /// Tickers trading on each date, sorted
    by_date: BTreeMap<NaiveDate, Vec<String>>,
    rows: usize,
}

/// Summary of a snapshot for health and load logging
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotStats {
    pub rows: usize,
    pub tickers: usize,
    pub trading_days: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
}

impl PriceSnapshot {
    /// Build a snapshot from ingested rows.
    ///
    /// Duplicate (ticker, date) rows keep the last occurrence. Missing MA240
    /// values are computed from close; change rates are derived from the
    /// previous close when `derive_change_rate` is set.
    pub fn build(
        market: Market,
        version: u64,
        records: Vec<DailyPriceRecord>,
        derive_change_rate: bool,
    ) -> Self {
        let mut grouped: HashMap<String, BTreeMap<NaiveDate, DailyPriceRecord>> = HashMap::new();
        for rec in records {
            grouped
                .entry(rec.ticker.clone())
                .or_default()
                .insert(rec.date, rec);
        }

        let mut series = BTreeMap::new();
        let mut by_date: BTreeMap<NaiveDate, Vec<String>> = BTreeMap::new();
        let mut rows = 0;

        for (ticker, dated) in grouped {
            let mut recs: Vec<DailyPriceRecord> = dated.into_values().collect();
            let closes: Vec<f64> = recs.iter().map(|r| r.close).collect();
            let ma240 = rolling_sma(&closes, MA240_PERIOD, MA240_PERIOD);

            for i in 0..recs.len() {
                if recs[i].ma240.is_none() {
                    recs[i].ma240 = ma240[i];
                }
                if derive_change_rate {
                    let close = recs[i].close;
                    let prev_close = if i > 0 { Some(recs[i - 1].close) } else { None };
                    recs[i].change_rate = prev_close
                        .and_then(|prev| percent_change(prev, close))
                        .unwrap_or(0.0);
                }
                by_date.entry(recs[i].date).or_default().push(ticker.clone());
            }

            rows += recs.len();
            series.insert(ticker, recs);
        }

        for tickers in by_date.values_mut() {
            tickers.sort();
        }

        Self {
            market: Some(market),
            version,
            series,
            by_date,
            rows,
        }
    }

    /// Snapshot from rows that already carry change rates
    pub fn from_records(market: Market, records: Vec<DailyPriceRecord>) -> Self {
        Self::build(market, 0, records, false)
    }

    pub fn empty(market: Market) -> Self {
        Self {
            market: Some(market),
            ..Default::default()
        }
    }

    pub fn market(&self) -> Option<Market> {
        self.market
    }

    /// Monotonic version assigned by the owning store
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn stats(&self) -> SnapshotStats {
        SnapshotStats {
            rows: self.rows,
            tickers: self.series.len(),
            trading_days: self.by_date.len(),
            first_date: self.by_date.keys().next().copied(),
            last_date: self.by_date.keys().next_back().copied(),
        }
    }

    /// Every trading date, ascending
    pub fn trading_dates(&self) -> Vec<NaiveDate> {
        self.by_date.keys().copied().collect()
    }

    /// Full date-sorted history of one ticker
    pub fn series(&self, ticker: &str) -> Option<&[DailyPriceRecord]> {
        self.series.get(ticker).map(|v| v.as_slice())
    }

    /// (ticker, latest name) for every listed ticker, ascending by ticker
    pub fn listings(&self) -> impl Iterator<Item = (&str, &str)> {
        self.series.iter().filter_map(|(ticker, recs)| {
            recs.last().map(|r| (ticker.as_str(), r.name.as_str()))
        })
    }

    fn position(&self, ticker: &str, date: NaiveDate) -> Option<(&[DailyPriceRecord], usize)> {
        let recs = self.series.get(ticker)?;
        let idx = recs.partition_point(|r| r.date < date);
        Some((recs.as_slice(), idx))
    }
}

impl PriceSeries for PriceSnapshot {
    fn record(&self, ticker: &str, date: NaiveDate) -> Option<&DailyPriceRecord> {
        let (recs, idx) = self.position(ticker, date)?;
        recs.get(idx).filter(|r| r.date == date)
    }

    fn next_record(&self, ticker: &str, date: NaiveDate) -> Option<&DailyPriceRecord> {
        let recs = self.series.get(ticker)?;
        let idx = recs.partition_point(|r| r.date <= date);
        recs.get(idx)
    }

    fn previous_record(&self, ticker: &str, date: NaiveDate) -> Option<&DailyPriceRecord> {
        let (recs, idx) = self.position(ticker, date)?;
        idx.checked_sub(1).and_then(|i| recs.get(i))
    }

    fn tickers_on(&self, date: NaiveDate) -> Vec<&str> {
        self.by_date
            .get(&date)
            .map(|tickers| tickers.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    fn dates_in_range(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        if start > end {
            return Vec::new();
        }
        self.by_date.range(start..=end).map(|(d, _)| *d).collect()
    }
}
