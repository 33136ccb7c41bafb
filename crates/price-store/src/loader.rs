//! CSV ingestion of daily price rows.
//!
//! Accepts the dashboard's Korean headers as well as English aliases. Rows with
//! an unreadable date are dropped; unreadable numbers become zero.

use chrono::NaiveDate;
use csv::StringRecord;
use market_core::DailyPriceRecord;
use std::path::Path;

use crate::StoreError;

const DATE_COLUMNS: &[&str] = &["날짜", "date"];
const CODE_COLUMNS: &[&str] = &["종목코드", "티커", "ticker", "code", "symbol"];
const NAME_COLUMNS: &[&str] = &["종목명", "name"];
const OPEN_COLUMNS: &[&str] = &["시가", "open"];
const HIGH_COLUMNS: &[&str] = &["고가", "high"];
const LOW_COLUMNS: &[&str] = &["저가", "low"];
const CLOSE_COLUMNS: &[&str] = &["종가", "close"];
const VOLUME_COLUMNS: &[&str] = &["거래량", "volume"];
const TRADED_VALUE_COLUMNS: &[&str] = &["거래대금", "traded_value", "trading_value"];
const CHANGE_COLUMNS: &[&str] = &["전일대비변동률(%)", "전일대비변동률", "change_rate"];
const MA240_COLUMNS: &[&str] = &["ma240", "MA240"];

/// Parsed rows plus whether the source carried its own change-rate column
#[derive(Debug, Default)]
pub struct LoadedRecords {
    pub records: Vec<DailyPriceRecord>,
    pub has_change_rate: bool,
    pub skipped_rows: usize,
}

struct ColumnMap {
    date: usize,
    code: usize,
    name: Option<usize>,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: Option<usize>,
    traded_value: usize,
    change_rate: Option<usize>,
    ma240: Option<usize>,
}

impl ColumnMap {
    fn from_headers(headers: &StringRecord) -> Result<Self, StoreError> {
        let find = |aliases: &[&str]| {
            headers
                .iter()
                .position(|h| aliases.iter().any(|a| h.trim().eq_ignore_ascii_case(a)))
        };
        let require = |aliases: &[&str]| {
            find(aliases).ok_or_else(|| StoreError::MissingColumn(aliases[0].to_string()))
        };

        Ok(Self {
            date: require(DATE_COLUMNS)?,
            code: require(CODE_COLUMNS)?,
            name: find(NAME_COLUMNS),
            open: require(OPEN_COLUMNS)?,
            high: require(HIGH_COLUMNS)?,
            low: require(LOW_COLUMNS)?,
            close: require(CLOSE_COLUMNS)?,
            volume: find(VOLUME_COLUMNS),
            traded_value: require(TRADED_VALUE_COLUMNS)?,
            change_rate: find(CHANGE_COLUMNS),
            ma240: find(MA240_COLUMNS),
        })
    }
}

/// Load a CSV file from disk
pub fn load_csv(path: &Path) -> Result<LoadedRecords, StoreError> {
    let data = std::fs::read_to_string(path)?;
    parse_csv(&data)
}

/// Parse CSV text into daily price records
pub fn parse_csv(data: &str) -> Result<LoadedRecords, StoreError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(data.trim_start_matches('\u{feff}').as_bytes());

    let columns = ColumnMap::from_headers(reader.headers()?)?;
    let mut loaded = LoadedRecords {
        has_change_rate: columns.change_rate.is_some(),
        ..Default::default()
    };

    for result in reader.records() {
        let row = result?;
        let field = |idx: usize| row.get(idx).unwrap_or("").trim();

        let ticker = field(columns.code).to_string();
        let date = match parse_date(field(columns.date)) {
            Some(d) if !ticker.is_empty() => d,
            _ => {
                loaded.skipped_rows += 1;
                continue;
            }
        };

        loaded.records.push(DailyPriceRecord {
            date,
            name: columns
                .name
                .map(|i| field(i).to_string())
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| ticker.clone()),
            ticker,
            open: parse_number(field(columns.open)),
            high: parse_number(field(columns.high)),
            low: parse_number(field(columns.low)),
            close: parse_number(field(columns.close)),
            volume: columns.volume.map(|i| parse_number(field(i))),
            traded_value: parse_number(field(columns.traded_value)),
            change_rate: columns
                .change_rate
                .map(|i| parse_number(field(i)))
                .unwrap_or(0.0),
            ma240: columns.ma240.and_then(|i| parse_optional(field(i))),
        });
    }

    Ok(loaded)
}

/// Accepts `YYYY-MM-DD`, `YYYYMMDD`, `YYYY/MM/DD` and datetimes with a date prefix
fn parse_date(raw: &str) -> Option<NaiveDate> {
    let head = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(head, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(head, "%Y/%m/%d"))
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y%m%d"))
        .ok()
}

fn parse_optional(raw: &str) -> Option<f64> {
    raw.replace(',', "")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

fn parse_number(raw: &str) -> f64 {
    parse_optional(raw).unwrap_or(0.0)
}
