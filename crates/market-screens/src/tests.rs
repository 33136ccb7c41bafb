use chrono::NaiveDate;
use market_core::{DailyPriceRecord, Market};
use price_store::PriceSnapshot;

use crate::history::{VOLUME_DOWN_COLOR, VOLUME_SUSPENDED_COLOR, VOLUME_UP_COLOR};
use crate::*;

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
}

fn row(ticker: &str, date: NaiveDate, close: f64, change_rate: f64, traded_value: f64) -> DailyPriceRecord {
    DailyPriceRecord {
        date,
        ticker: ticker.to_string(),
        name: format!("{} Co", ticker),
        open: close,
        high: close,
        low: close,
        close,
        volume: Some(100.0),
        traded_value,
        change_rate,
        ma240: None,
    }
}

fn kr(records: Vec<DailyPriceRecord>) -> PriceSnapshot {
    PriceSnapshot::from_records(Market::Kr, records)
}

fn trading_value() -> ScreenCategory {
    ScreenCategory::parse(Market::Kr, "trading_value")
}

#[test]
fn test_kr_day_lists() {
    let data = kr(vec![
        row("AAA", day(2), 1000.0, 5.0, 300.0),
        row("BBB", day(2), 1000.0, 2.0, 900.0),
        row("CCC", day(2), 1000.0, 8.0, 100.0),
    ]);

    let DayLists::Kr(lists) = MarketScreener::new(Market::Kr, &data).day_lists(day(2)) else {
        panic!("expected korean lists");
    };
    let by_value: Vec<&str> = lists.trading_value.iter().map(|r| r.ticker.as_str()).collect();
    let by_rate: Vec<&str> = lists.change_rate.iter().map(|r| r.ticker.as_str()).collect();

    // BBB rose less than 3%
    assert_eq!(by_value, vec!["AAA", "CCC"]);
    assert_eq!(by_rate, vec!["CCC", "AAA", "BBB"]);
}

#[test]
fn test_us_day_lists_split_by_band() {
    let data = PriceSnapshot::from_records(
        Market::Us,
        vec![
            row("BIG", day(2), 120.0, 4.0, 10.0),
            row("MID", day(2), 7.5, 6.0, 10.0),
            row("PENNY", day(2), 1.2, -3.0, 10.0),
        ],
    );

    let DayLists::Us(lists) = MarketScreener::new(Market::Us, &data).day_lists(day(2)) else {
        panic!("expected us lists");
    };
    assert_eq!(lists.high_price_volume.len(), 1);
    assert_eq!(lists.mid_price_rate[0].ticker, "MID");
    assert!(lists.low_price_volume.is_empty());
    assert_eq!(lists.low_price_rate[0].ticker, "PENNY");

    let json = serde_json::to_value(DayLists::Us(lists)).unwrap();
    assert!(json.get("high_price_volume").is_some());
}

#[test]
fn test_empty_day_has_empty_lists() {
    let data = kr(vec![row("AAA", day(2), 1000.0, 5.0, 300.0)]);
    assert!(MarketScreener::new(Market::Kr, &data).day_lists(day(3)).is_empty());
}

#[test]
fn test_calendar() {
    let data = kr(vec![
        row("AAA", NaiveDate::from_ymd_opt(2022, 12, 30).unwrap(), 1.0, 0.0, 1.0),
        row("AAA", day(2), 1.0, 0.0, 1.0),
    ]);
    let calendar = MarketScreener::new(Market::Kr, &data).calendar();
    assert_eq!(calendar.dates.len(), 2);
    assert_eq!(calendar.min_year, 2022);
    assert_eq!(calendar.max_year, 2024);
    assert_eq!((calendar.initial_year, calendar.initial_month), (2024, 5));
}

#[test]
fn test_frequent_counts_appearances() {
    let data = kr(vec![
        row("AAA", day(2), 1000.0, 5.0, 100.0),
        row("AAA", day(3), 1000.0, 5.0, 100.0),
        row("BBB", day(2), 1000.0, 5.0, 500.0),
        row("BBB", day(3), 1000.0, 1.0, 500.0),
        row("CCC", day(3), 1000.0, 5.0, 50.0),
        row("DDD", day(3), 1000.0, 4.0, 900.0),
    ]);

    let screener = MarketScreener::new(Market::Kr, &data);
    let frequent = screener.frequent(day(3), 1, trading_value());
    let order: Vec<(&str, usize)> = frequent
        .iter()
        .map(|f| (f.ticker.as_str(), f.appearances))
        .collect();

    assert_eq!(order, vec![("AAA", 2), ("DDD", 1), ("BBB", 1), ("CCC", 1)]);
    assert_eq!(frequent[0].rank, 1);
    assert_eq!(frequent[0].period_sessions, 2);
    assert_eq!(frequent[1].latest_traded_value, 900.0);

    assert!(screener.frequent(day(1), 4, trading_value()).is_empty());
}

#[test]
fn test_frequent_huge_period_covers_all_history() {
    let data = kr(vec![
        row("AAA", day(2), 1000.0, 5.0, 100.0),
        row("AAA", day(3), 1000.0, 5.0, 100.0),
        row("BBB", day(3), 1000.0, 5.0, 200.0),
    ]);
    let screener = MarketScreener::new(Market::Kr, &data);

    let all = screener.frequent(day(3), usize::MAX, trading_value());
    assert_eq!(all, screener.frequent(day(3), 100, trading_value()));
    assert_eq!(all[0].ticker, "AAA");
    assert_eq!(all[0].appearances, 2);
    assert_eq!(all[0].period_sessions, 2);
}

#[test]
fn test_pullback() {
    let data = kr(vec![
        row("AAA", day(2), 1000.0, 6.0, 300.0),
        row("AAA", day(3), 980.0, -2.0, 200.0),
        row("BBB", day(2), 1000.0, 4.0, 100.0),
        row("BBB", day(3), 1010.0, 1.0, 900.0),
        row("CCC", day(2), 1000.0, 1.0, 100.0),
        row("CCC", day(3), 990.0, -1.0, 900.0),
    ]);

    let screener = MarketScreener::new(Market::Kr, &data);
    let pullback = screener.pullback(day(3), 1, trading_value());

    // CCC fell but never made the list
    assert_eq!(pullback.len(), 1);
    assert_eq!(pullback[0].ticker, "AAA");
    assert_eq!(pullback[0].reference_date, day(2));
    assert_eq!(pullback[0].change_rate, -2.0);

    assert!(screener.pullback(day(2), 1, trading_value()).is_empty());
    assert!(screener.pullback(day(9), 1, trading_value()).is_empty());
}

#[test]
fn test_consecutive_rise() {
    let data = kr(vec![
        row("AAA", day(2), 1000.0, 5.0, 100.0),
        row("AAA", day(3), 1010.0, 1.0, 100.0),
        row("AAA", day(4), 1020.0, 1.0, 100.0),
        row("BBB", day(2), 1000.0, 5.0, 200.0),
        row("BBB", day(3), 1000.0, 0.0, 200.0),
        row("BBB", day(4), 1020.0, 2.0, 200.0),
        row("CCC", day(2), 1000.0, 9.0, 50.0),
        row("CCC", day(3), 1010.0, 1.0, 50.0),
        row("CCC", day(4), 1030.0, 2.0, 500.0),
    ]);

    let screener = MarketScreener::new(Market::Kr, &data);

    let three = screener.consecutive_rise(day(4), 3, trading_value());
    let tickers: Vec<&str> = three.iter().map(|s| s.ticker.as_str()).collect();
    assert_eq!(tickers, vec!["CCC", "AAA"]);
    assert_eq!(three[0].streak_days, 3);

    // not enough history before the 3rd
    assert!(screener.consecutive_rise(day(3), 3, trading_value()).is_empty());
    assert!(screener.consecutive_rise(day(4), 0, trading_value()).is_empty());
}

#[test]
fn test_search_uses_latest_names() {
    let mut renamed = row("005930", day(3), 1.0, 0.0, 1.0);
    renamed.name = "Samsung Electronics".to_string();
    let data = kr(vec![row("005930", day(2), 1.0, 0.0, 1.0), renamed]);

    let found = MarketScreener::new(Market::Kr, &data).search("samsung", 50);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].code, "005930");
}

#[test]
fn test_history_series() {
    let mut halted = row("AAA", day(4), 105.0, 0.0, 0.0);
    halted.open = 0.0;
    let data = PriceSnapshot::from_records(
        Market::Us,
        vec![
            row("AAA", day(2), 100.0, 0.0, 10.0),
            row("AAA", day(3), 110.0, 10.0, 20.0),
            halted,
            row("AAA", day(7), 99.0, -5.7, 30.0),
        ],
    );

    let chart = MarketScreener::new(Market::Us, &data).history("AAA", 90, None);
    assert_eq!(chart.line.len(), 4);
    // no candle while suspended
    assert_eq!(chart.candle.len(), 3);
    assert_eq!(chart.change[&day(2)], 0.0);
    assert_eq!(chart.change[&day(3)], 10.0);
    assert_eq!(chart.volume[1].color, VOLUME_UP_COLOR);
    assert_eq!(chart.volume[2].color, VOLUME_SUSPENDED_COLOR);
    assert_eq!(chart.volume[3].color, VOLUME_DOWN_COLOR);
    assert_eq!(chart.ma20[1].value, 105.0);
    assert_eq!(chart.ma240.len(), 4);
}

#[test]
fn test_history_window() {
    let records: Vec<DailyPriceRecord> = (1..=10)
        .map(|d| row("AAA", day(d), 100.0 + d as f64, 1.0, 1.0))
        .collect();
    let data = kr(records);
    let screener = MarketScreener::new(Market::Kr, &data);

    let tail = screener.history("AAA", 3, None);
    assert_eq!(tail.line.first().unwrap().time, day(8));

    // starts 3 sessions before the end date and runs to the latest session
    let anchored = screener.history("AAA", 3, Some(day(5)));
    assert_eq!(anchored.line.first().unwrap().time, day(3));
    assert_eq!(anchored.line.last().unwrap().time, day(10));
    assert_eq!(anchored.end_date, Some(day(5)));

    // moving averages span the whole history, rounded to whole won
    assert_eq!(anchored.ma20[0].value, 102.0);

    assert!(screener.history("ZZZ", 3, None).line.is_empty());
}
