//! Chart series for one ticker

use chrono::NaiveDate;
use market_core::moving_average::rolling_sma;
use market_core::{round_to, DailyPriceRecord, Market};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const VOLUME_UP_COLOR: &str = "#EF535080";
pub const VOLUME_DOWN_COLOR: &str = "#2196F380";
pub const VOLUME_SUSPENDED_COLOR: &str = "#6B728080";

const SHORT_MA_PERIOD: usize = 20;
const LONG_MA_PERIOD: usize = 240;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub time: NaiveDate,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub time: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeBar {
    pub time: NaiveDate,
    pub value: f64,
    pub color: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartHistory {
    pub line: Vec<ChartPoint>,
    /// Suspended sessions have no candle
    pub candle: Vec<Candle>,
    pub volume: Vec<VolumeBar>,
    /// Close-to-close change per date, in percent
    pub change: BTreeMap<NaiveDate, f64>,
    pub ma20: Vec<ChartPoint>,
    pub ma240: Vec<ChartPoint>,
    pub end_date: Option<NaiveDate>,
}

impl ChartHistory {
    pub fn empty(end_date: Option<NaiveDate>) -> Self {
        Self {
            end_date,
            ..Default::default()
        }
    }

    /// Build the chart from a ticker's full date-sorted history.
    ///
    /// Without `end_date` the last `days` sessions are shown. With it, the view
    /// starts `days` sessions before `end_date` and still runs to the latest
    /// session so the chart can scroll forward. Moving averages always use the
    /// whole history and accept partial windows.
    pub fn build(
        market: Market,
        series: &[DailyPriceRecord],
        days: usize,
        end_date: Option<NaiveDate>,
    ) -> Self {
        if series.is_empty() {
            return Self::empty(end_date);
        }

        let closes: Vec<f64> = series.iter().map(|r| r.close).collect();
        let ma20 = rolling_sma(&closes, SHORT_MA_PERIOD, 1);
        let ma240 = rolling_sma(&closes, LONG_MA_PERIOD, 1);

        let start = match end_date {
            Some(end) => {
                let upto_end = series.partition_point(|r| r.date <= end);
                upto_end.saturating_sub(days)
            }
            None => series.len().saturating_sub(days),
        };

        let decimals = market.price_decimals();
        let mut chart = Self::empty(end_date);
        let mut prev_close: Option<f64> = None;

        for (i, rec) in series.iter().enumerate().skip(start) {
            let close = rec.close;
            let change = match prev_close {
                Some(prev) if prev != 0.0 => (close - prev) / prev * 100.0,
                _ => 0.0,
            };
            chart.change.insert(rec.date, round_to(change, 2));
            chart.line.push(ChartPoint { time: rec.date, value: close });

            let suspended = rec.is_suspended();
            if !suspended {
                chart.candle.push(Candle {
                    time: rec.date,
                    open: rec.open,
                    high: rec.high,
                    low: rec.low,
                    close,
                });
            }

            let color = if suspended {
                VOLUME_SUSPENDED_COLOR
            } else if close >= prev_close.filter(|p| *p != 0.0).unwrap_or(close) {
                VOLUME_UP_COLOR
            } else {
                VOLUME_DOWN_COLOR
            };
            chart.volume.push(VolumeBar {
                time: rec.date,
                value: rec.traded_value,
                color: color.to_string(),
            });

            if let Some(value) = ma20[i] {
                chart.ma20.push(ChartPoint { time: rec.date, value: round_to(value, decimals) });
            }
            if let Some(value) = ma240[i] {
                chart.ma240.push(ChartPoint { time: rec.date, value: round_to(value, decimals) });
            }

            prev_close = Some(close);
        }

        chart
    }
}
