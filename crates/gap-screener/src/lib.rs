//! Gap Screener
//!
//! Scans a date range of daily records and keeps the (ticker, date) pairs whose
//! price moved between two reference points by a chosen amount, optionally
//! confirmed by further directional checks. Matches are classified against
//! their 240-session moving average and can be re-ranked without rescanning.

pub mod cancel;
pub mod classifier;
pub mod engine;
pub mod models;
pub mod predicate;
pub mod ranker;

pub use cancel::CancelFlag;
pub use classifier::{classify_ma_position, MaPositionClassifier};
pub use engine::{GapScan, GapScanEngine};
pub use models::{
    Direction, GapQuery, GapResult, MaPosition, MaPositionFilter, PredicateStage, SortColumn,
    SortDirection, StageCondition, StageRole,
};
pub use predicate::{DayWindow, PredicateEvaluator, StageOutcome};
pub use ranker::{RankOptions, ResultRanker};
