use std::io::Write;
use std::sync::Arc;

use chrono::NaiveDate;
use market_core::{DailyPriceRecord, Market, PriceSeries};

use crate::{PriceSnapshot, PriceStore};

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
}

fn rec(ticker: &str, date: NaiveDate, close: f64) -> DailyPriceRecord {
    DailyPriceRecord {
        date,
        ticker: ticker.to_string(),
        name: format!("{} Corp", ticker),
        open: close,
        high: close,
        low: close,
        close,
        volume: Some(1000.0),
        traded_value: close * 1000.0,
        change_rate: 0.0,
        ma240: None,
    }
}

#[test]
fn test_neighbours_skip_missing_sessions() {
    // BBB is halted on the 3rd
    let snapshot = PriceSnapshot::from_records(
        Market::Us,
        vec![
            rec("AAA", day(2), 10.0),
            rec("AAA", day(3), 11.0),
            rec("AAA", day(4), 12.0),
            rec("BBB", day(2), 20.0),
            rec("BBB", day(4), 22.0),
        ],
    );

    assert_eq!(snapshot.record("BBB", day(3)), None);
    assert_eq!(snapshot.next_record("BBB", day(2)).unwrap().date, day(4));
    assert_eq!(snapshot.previous_record("BBB", day(4)).unwrap().date, day(2));
    assert_eq!(snapshot.previous_record("AAA", day(2)), None);
    assert_eq!(snapshot.next_record("AAA", day(4)), None);
    assert_eq!(snapshot.record("ZZZ", day(2)), None);
}

#[test]
fn test_dates_and_tickers_are_ordered() {
    let snapshot = PriceSnapshot::from_records(
        Market::Us,
        vec![
            rec("CCC", day(5), 1.0),
            rec("AAA", day(5), 1.0),
            rec("BBB", day(2), 1.0),
        ],
    );

    assert_eq!(snapshot.dates_in_range(day(1), day(31)), vec![day(2), day(5)]);
    assert_eq!(snapshot.dates_in_range(day(3), day(4)), Vec::<NaiveDate>::new());
    assert_eq!(snapshot.dates_in_range(day(5), day(2)), Vec::<NaiveDate>::new());
    assert_eq!(snapshot.tickers_on(day(5)), vec!["AAA", "CCC"]);
    assert!(snapshot.tickers_on(day(9)).is_empty());
}

#[test]
fn test_ma240_requires_full_window() {
    let start = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap();
    let records: Vec<DailyPriceRecord> = (0..241)
        .map(|i| rec("AAA", start + chrono::Duration::days(i), (i + 1) as f64))
        .collect();

    let snapshot = PriceSnapshot::from_records(Market::Us, records);
    let series = snapshot.series("AAA").unwrap();

    assert_eq!(series[238].ma240, None);
    // mean of 1..=240
    assert_eq!(series[239].ma240, Some(120.5));
    // mean of 2..=241
    assert_eq!(series[240].ma240, Some(121.5));
}

#[test]
fn test_derived_change_rate() {
    let snapshot = PriceSnapshot::build(
        Market::Kr,
        1,
        vec![rec("AAA", day(2), 100.0), rec("AAA", day(3), 110.0)],
        true,
    );
    let series = snapshot.series("AAA").unwrap();
    assert_eq!(series[0].change_rate, 0.0);
    assert_eq!(series[1].change_rate, 10.0);
}

#[test]
fn test_swap_keeps_reader_snapshot_intact() {
    let store = PriceStore::new(Market::Us);
    store.replace(vec![rec("AAA", day(2), 10.0)], false);

    let held: Arc<PriceSnapshot> = store.snapshot();
    let mut next = rec("AAA", day(3), 11.0);
    next.change_rate = 10.0;
    store.replace(vec![rec("AAA", day(2), 10.0), next], false);

    // In-flight reader still sees the old version
    assert_eq!(held.len(), 1);
    assert_eq!(held.record("AAA", day(3)), None);

    let fresh = store.snapshot();
    assert_eq!(fresh.len(), 2);
    assert!(fresh.version() > held.version());
    assert_eq!(fresh.record("AAA", day(3)).unwrap().change_rate, 10.0);
}

#[test]
fn test_load_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "날짜,티커,종목명,시가,고가,저가,종가,거래대금").unwrap();
    writeln!(file, "2024-01-02,AAPL,Apple,100,101,99,100,5000").unwrap();
    writeln!(file, "2024-01-03,AAPL,Apple,103,106,102,105,6000").unwrap();

    let store = PriceStore::new(Market::Us);
    let snapshot = store.load_file(file.path()).unwrap();

    assert_eq!(snapshot.len(), 2);
    // no change-rate column, derived from closes
    assert_eq!(snapshot.record("AAPL", day(3)).unwrap().change_rate, 5.0);
}

#[test]
fn test_missing_file_leaves_market_empty() {
    let store = PriceStore::new(Market::Kr);
    let snapshot = store
        .load_file(std::path::Path::new("/nonexistent/kr_stock_data.csv"))
        .unwrap();
    assert!(snapshot.is_empty());
}
