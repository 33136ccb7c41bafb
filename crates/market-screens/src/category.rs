use chrono::NaiveDate;
use market_core::{DailyPriceRecord, Market, PriceBand, PriceSeries};
use serde::{Deserialize, Serialize};

/// Rows kept in every daily top list
pub const TOP_LIST_SIZE: usize = 300;

/// Minimum change rate (%) to enter a traded-value list
pub const MIN_VOLUME_LIST_RATE: f64 = 3.0;

/// How a daily list is ordered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListRanking {
    /// Risers of at least 3%, by traded value
    TradedValue,
    /// Everything, by change rate
    ChangeRate,
}

/// A daily list selector: price band plus ranking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScreenCategory {
    pub band: PriceBand,
    pub ranking: ListRanking,
}

impl ScreenCategory {
    pub const fn new(band: PriceBand, ranking: ListRanking) -> Self {
        Self { band, ranking }
    }

    /// Read a category string such as `trading_value` or `mid_price_rate`.
    ///
    /// `trading_value` and any `*_volume` category rank by traded value, the
    /// rest by change rate. US categories carry a price band prefix; anything
    /// that is neither `high_price*` nor `mid_price*` is the low band.
    pub fn parse(market: Market, category: &str) -> Self {
        let category = category.trim();
        let ranking = if category == "trading_value" || category.ends_with("_volume") {
            ListRanking::TradedValue
        } else {
            ListRanking::ChangeRate
        };
        let band = match market {
            Market::Kr => PriceBand::All,
            Market::Us if category.starts_with("high_price") => PriceBand::High,
            Market::Us if category.starts_with("mid_price") => PriceBand::Mid,
            Market::Us => PriceBand::Low,
        };
        Self { band, ranking }
    }

    /// Default category of a market's screens
    pub fn default_for(market: Market) -> Self {
        match market {
            Market::Kr => Self::new(PriceBand::All, ListRanking::TradedValue),
            Market::Us => Self::new(PriceBand::High, ListRanking::TradedValue),
        }
    }

    pub fn key(&self) -> String {
        let suffix = match self.ranking {
            ListRanking::TradedValue => "volume",
            ListRanking::ChangeRate => "rate",
        };
        match (self.band, self.ranking) {
            (PriceBand::All, ListRanking::TradedValue) => "trading_value".to_string(),
            (PriceBand::All, ListRanking::ChangeRate) => "change_rate".to_string(),
            (band, _) => format!("{}_price_{}", band.as_str(), suffix),
        }
    }
}

/// The top list of `category` on `date`
pub fn top_members<S: PriceSeries + ?Sized>(
    series: &S,
    date: NaiveDate,
    category: ScreenCategory,
) -> Vec<&DailyPriceRecord> {
    let mut rows: Vec<&DailyPriceRecord> = series
        .records_on(date)
        .into_iter()
        .filter(|r| category.band.contains(r.close))
        .collect();

    match category.ranking {
        ListRanking::TradedValue => {
            rows.retain(|r| r.change_rate >= MIN_VOLUME_LIST_RATE);
            rows.sort_by(|a, b| b.traded_value.total_cmp(&a.traded_value));
        }
        ListRanking::ChangeRate => {
            rows.sort_by(|a, b| b.change_rate.total_cmp(&a.change_rate));
        }
    }

    rows.truncate(TOP_LIST_SIZE);
    rows
}
