//! Market Screens
//!
//! Date-anchored views over one market snapshot: the daily top lists, the
//! frequent / pullback / consecutive-rise screens built on them, symbol search
//! and chart history.

pub mod category;
pub mod daily;
pub mod history;
pub mod screener;
pub mod search;

pub use category::{top_members, ListRanking, ScreenCategory, MIN_VOLUME_LIST_RATE, TOP_LIST_SIZE};
pub use daily::{DayLists, KrDayLists, TradingCalendar, UsDayLists};
pub use history::{Candle, ChartHistory, ChartPoint, VolumeBar};
pub use screener::{ConsecutiveRiseStock, FrequentStock, MarketScreener, PullbackStock};
pub use search::{search_symbols, SymbolMatch};

#[cfg(test)]
mod tests;
