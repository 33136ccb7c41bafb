use chrono::{Datelike, Local, NaiveDate};
use market_core::{DailyPriceRecord, Market, PriceBand, PriceSeries};
use price_store::PriceSnapshot;
use serde::{Deserialize, Serialize};

use crate::category::{top_members, ListRanking, ScreenCategory};

/// Dates a market has data for, plus where the calendar should open
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingCalendar {
    pub dates: Vec<NaiveDate>,
    pub initial_year: i32,
    pub initial_month: u32,
    pub min_year: i32,
    pub max_year: i32,
}

impl TradingCalendar {
    /// Opens on the month of the latest session; an empty market opens on today
    pub fn from_snapshot(snapshot: &PriceSnapshot) -> Self {
        let dates = snapshot.trading_dates();
        let today = Local::now().date_naive();
        let first = dates.first().copied().unwrap_or(today);
        let last = dates.last().copied().unwrap_or(today);

        Self {
            initial_year: last.year(),
            initial_month: last.month(),
            min_year: first.year(),
            max_year: last.year(),
            dates,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KrDayLists {
    pub trading_value: Vec<DailyPriceRecord>,
    pub change_rate: Vec<DailyPriceRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsDayLists {
    pub high_price_volume: Vec<DailyPriceRecord>,
    pub high_price_rate: Vec<DailyPriceRecord>,
    pub mid_price_volume: Vec<DailyPriceRecord>,
    pub mid_price_rate: Vec<DailyPriceRecord>,
    pub low_price_volume: Vec<DailyPriceRecord>,
    pub low_price_rate: Vec<DailyPriceRecord>,
}

/// Daily top lists; Korea has one band, the US splits by price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DayLists {
    Kr(KrDayLists),
    Us(UsDayLists),
}

impl DayLists {
    pub fn for_date<S: PriceSeries + ?Sized>(series: &S, market: Market, date: NaiveDate) -> Self {
        let list = |band: PriceBand, ranking: ListRanking| -> Vec<DailyPriceRecord> {
            top_members(series, date, ScreenCategory::new(band, ranking))
                .into_iter()
                .cloned()
                .collect()
        };

        match market {
            Market::Kr => DayLists::Kr(KrDayLists {
                trading_value: list(PriceBand::All, ListRanking::TradedValue),
                change_rate: list(PriceBand::All, ListRanking::ChangeRate),
            }),
            Market::Us => DayLists::Us(UsDayLists {
                high_price_volume: list(PriceBand::High, ListRanking::TradedValue),
                high_price_rate: list(PriceBand::High, ListRanking::ChangeRate),
                mid_price_volume: list(PriceBand::Mid, ListRanking::TradedValue),
                mid_price_rate: list(PriceBand::Mid, ListRanking::ChangeRate),
                low_price_volume: list(PriceBand::Low, ListRanking::TradedValue),
                low_price_rate: list(PriceBand::Low, ListRanking::ChangeRate),
            }),
        }
    }

    /// Total rows across every list
    pub fn len(&self) -> usize {
        match self {
            DayLists::Kr(kr) => kr.trading_value.len() + kr.change_rate.len(),
            DayLists::Us(us) => {
                us.high_price_volume.len()
                    + us.high_price_rate.len()
                    + us.mid_price_volume.len()
                    + us.mid_price_rate.len()
                    + us.low_price_volume.len()
                    + us.low_price_rate.len()
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
