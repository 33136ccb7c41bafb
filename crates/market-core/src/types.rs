use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::MarketError;

/// Listing market served by the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Market {
    Kr,
    Us,
}

impl Market {
    pub fn as_str(&self) -> &'static str {
        match self {
            Market::Kr => "kr",
            Market::Us => "us",
        }
    }

    /// Decimal places used when presenting prices (won has no minor unit)
    pub fn price_decimals(&self) -> u32 {
        match self {
            Market::Kr => 0,
            Market::Us => 2,
        }
    }

    /// Round a price the way this market displays it
    pub fn round_price(&self, price: f64) -> f64 {
        round_to(price, self.price_decimals())
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Market {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "kr" => Ok(Market::Kr),
            "us" => Ok(Market::Us),
            other => Err(MarketError::UnknownField(format!("market '{other}'"))),
        }
    }
}

/// One ticker on one trading day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPriceRecord {
    pub date: NaiveDate,
    pub ticker: String,
    pub name: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: Option<f64>,
    /// Price × volume in the listing currency
    pub traded_value: f64,
    /// Close-to-close change versus the previous session, in percent
    pub change_rate: f64,
    /// 240-session simple moving average of close, absent until enough history exists
    #[serde(default)]
    pub ma240: Option<f64>,
}

impl DailyPriceRecord {
    /// Trading halts are ingested with a zero open
    pub fn is_suspended(&self) -> bool {
        self.open == 0.0
    }
}

/// Reference price on the anchor day of a predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaseField {
    PrevClose,
    Open,
    Close,
}

impl BaseField {
    pub fn as_str(&self) -> &'static str {
        match self {
            BaseField::PrevClose => "prev_close",
            BaseField::Open => "open",
            BaseField::Close => "close",
        }
    }
}

impl FromStr for BaseField {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "prev_close" => Ok(BaseField::PrevClose),
            "open" => Ok(BaseField::Open),
            "close" => Ok(BaseField::Close),
            other => Err(MarketError::UnknownField(format!("base price '{other}'"))),
        }
    }
}

/// Price compared against the base, possibly on the following session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareField {
    Open,
    Close,
    NextOpen,
    NextClose,
}

impl CompareField {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompareField::Open => "open",
            CompareField::Close => "close",
            CompareField::NextOpen => "next_open",
            CompareField::NextClose => "next_close",
        }
    }

    pub fn needs_next_session(&self) -> bool {
        matches!(self, CompareField::NextOpen | CompareField::NextClose)
    }
}

impl FromStr for CompareField {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "open" => Ok(CompareField::Open),
            "close" => Ok(CompareField::Close),
            "next_open" => Ok(CompareField::NextOpen),
            "next_close" => Ok(CompareField::NextClose),
            other => Err(MarketError::UnknownField(format!("compare price '{other}'"))),
        }
    }
}

/// Close-price bucket used by the US views
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceBand {
    #[default]
    All,
    High,
    Mid,
    Low,
}

impl PriceBand {
    /// High: close >= 10, Mid: 5 <= close < 10, Low: close < 5
    pub fn contains(&self, close: f64) -> bool {
        match self {
            PriceBand::All => true,
            PriceBand::High => close >= 10.0,
            PriceBand::Mid => (5.0..10.0).contains(&close),
            PriceBand::Low => close < 5.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PriceBand::All => "all",
            PriceBand::High => "high",
            PriceBand::Mid => "mid",
            PriceBand::Low => "low",
        }
    }
}

impl FromStr for PriceBand {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "all" => Ok(PriceBand::All),
            "high" => Ok(PriceBand::High),
            "mid" => Ok(PriceBand::Mid),
            "low" => Ok(PriceBand::Low),
            other => Err(MarketError::UnknownField(format!("price band '{other}'"))),
        }
    }
}

/// Percentage change from `base` to `value`, `None` when the base cannot divide
pub fn percent_change(base: f64, value: f64) -> Option<f64> {
    if base == 0.0 || !base.is_finite() || !value.is_finite() {
        return None;
    }
    Some((value - base) * 100.0 / base)
}

pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}
