use chrono::NaiveDate;

use crate::DailyPriceRecord;

/// Read-only view over ingested daily price records.
///
/// Lookups never fail: a missing (ticker, date) combination is `None`, and
/// callers treat it as "exclude from results".
pub trait PriceSeries: Send + Sync {
    /// Record of `ticker` on exactly `date`
    fn record(&self, ticker: &str, date: NaiveDate) -> Option<&DailyPriceRecord>;

    /// Chronologically next record of `ticker` after `date` (skips holidays and halts)
    fn next_record(&self, ticker: &str, date: NaiveDate) -> Option<&DailyPriceRecord>;

    /// Chronologically previous record of `ticker` before `date`
    fn previous_record(&self, ticker: &str, date: NaiveDate) -> Option<&DailyPriceRecord>;

    /// Tickers with a record on `date`, in ascending ticker order
    fn tickers_on(&self, date: NaiveDate) -> Vec<&str>;

    /// Trading dates within `[start, end]`, ascending
    fn dates_in_range(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate>;

    /// All records on `date`, in ascending ticker order
    fn records_on(&self, date: NaiveDate) -> Vec<&DailyPriceRecord> {
        self.tickers_on(date)
            .into_iter()
            .filter_map(|ticker| self.record(ticker, date))
            .collect()
    }
}
