//! Gap Screener Data Models

use chrono::NaiveDate;
use market_core::{BaseField, CompareField, MarketError};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Required direction of a confirmation stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl FromStr for Direction {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            other => Err(MarketError::UnknownField(format!("direction '{other}'"))),
        }
    }
}

/// Position of a stage in the screening chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageRole {
    Primary,
    Extra,
    Detail,
}

impl StageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageRole::Primary => "primary",
            StageRole::Extra => "extra",
            StageRole::Detail => "detail",
        }
    }
}

/// What a stage demands of the compare value relative to the base value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageCondition {
    /// Inclusive percent range
    RateRange { min_rate: f64, max_rate: f64 },
    /// Strictly above (up) or below (down) the base
    Direction(Direction),
}

/// One price-comparison predicate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredicateStage {
    pub role: StageRole,
    pub base: Option<BaseField>,
    pub compare: Option<CompareField>,
    pub condition: Option<StageCondition>,
}

impl PredicateStage {
    pub fn primary(base: BaseField, compare: CompareField, min_rate: f64, max_rate: f64) -> Self {
        Self {
            role: StageRole::Primary,
            base: Some(base),
            compare: Some(compare),
            condition: Some(StageCondition::RateRange { min_rate, max_rate }),
        }
    }

    pub fn directional(
        role: StageRole,
        base: Option<BaseField>,
        compare: Option<CompareField>,
        direction: Option<Direction>,
    ) -> Self {
        Self {
            role,
            base,
            compare,
            condition: direction.map(StageCondition::Direction),
        }
    }

    /// A stage takes part in screening only when every part of it is set
    pub fn is_configured(&self) -> bool {
        self.base.is_some() && self.compare.is_some() && self.condition.is_some()
    }

    pub fn needs_previous_session(&self) -> bool {
        self.is_configured() && self.base == Some(BaseField::PrevClose)
    }

    pub fn needs_next_session(&self) -> bool {
        self.is_configured() && self.compare.is_some_and(|c| c.needs_next_session())
    }
}

/// Caller-supplied gap screening request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Primary stage first, then the optional extra and detail stages
    pub stages: Vec<PredicateStage>,
    /// Case-insensitive substring matched against ticker or name
    pub ticker_filter: Option<String>,
}

impl GapQuery {
    pub fn new(
        start_date: NaiveDate,
        end_date: NaiveDate,
        base: BaseField,
        compare: CompareField,
        min_rate: f64,
        max_rate: f64,
    ) -> Self {
        Self {
            start_date,
            end_date,
            stages: vec![PredicateStage::primary(base, compare, min_rate, max_rate)],
            ticker_filter: None,
        }
    }

    pub fn with_extra(
        self,
        base: Option<BaseField>,
        compare: Option<CompareField>,
        direction: Option<Direction>,
    ) -> Self {
        self.with_stage(PredicateStage::directional(StageRole::Extra, base, compare, direction))
    }

    pub fn with_detail(
        self,
        base: Option<BaseField>,
        compare: Option<CompareField>,
        direction: Option<Direction>,
    ) -> Self {
        self.with_stage(PredicateStage::directional(StageRole::Detail, base, compare, direction))
    }

    pub fn with_ticker_filter(mut self, filter: impl Into<String>) -> Self {
        let filter = filter.into().trim().to_uppercase();
        self.ticker_filter = if filter.is_empty() { None } else { Some(filter) };
        self
    }

    fn with_stage(mut self, stage: PredicateStage) -> Self {
        self.stages.retain(|s| s.role != stage.role);
        self.stages.push(stage);
        self.stages.sort_by_key(|s| s.role as u8);
        self
    }

    pub fn primary(&self) -> Option<&PredicateStage> {
        self.stages.iter().find(|s| s.role == StageRole::Primary)
    }

    /// Stages that actually filter, in evaluation order
    pub fn configured_stages(&self) -> impl Iterator<Item = &PredicateStage> {
        self.stages.iter().filter(|s| s.is_configured())
    }

    /// Boundary validation; the scan assumes a query that passed this
    pub fn validate(&self) -> Result<(), MarketError> {
        if self.end_date < self.start_date {
            return Err(MarketError::InvalidQuery(format!(
                "end date {} is before start date {}",
                self.end_date, self.start_date
            )));
        }

        let primary = self
            .primary()
            .ok_or_else(|| MarketError::InvalidQuery("primary stage is required".into()))?;
        match primary.condition {
            Some(StageCondition::RateRange { min_rate, max_rate }) => {
                if min_rate.is_nan() || max_rate.is_nan() {
                    return Err(MarketError::InvalidQuery("rate bounds must be numbers".into()));
                }
                if min_rate > max_rate {
                    return Err(MarketError::InvalidQuery(format!(
                        "min rate {min_rate} is greater than max rate {max_rate}"
                    )));
                }
            }
            _ => {
                return Err(MarketError::InvalidQuery(
                    "primary stage needs a rate range".into(),
                ))
            }
        }
        if !primary.is_configured() {
            return Err(MarketError::InvalidQuery(
                "primary stage needs base and compare prices".into(),
            ));
        }

        for stage in self.stages.iter().filter(|s| s.role != StageRole::Primary) {
            if let Some(StageCondition::RateRange { .. }) = stage.condition {
                return Err(MarketError::InvalidQuery(format!(
                    "{} stage takes a direction, not a rate range",
                    stage.role.as_str()
                )));
            }
        }

        Ok(())
    }
}

/// Close relative to the 240-session moving average
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaPosition {
    Above,
    Below,
}

/// One (date, ticker) pair that satisfied every configured stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapResult {
    pub date: NaiveDate,
    pub ticker: String,
    pub name: String,
    pub close: f64,
    /// Primary stage move, in percent
    pub change_rate: f64,
    pub traded_value: f64,
    pub ma240: Option<f64>,
    pub ma_position: Option<MaPosition>,
}

/// Columns a result set can be ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortColumn {
    #[default]
    Date,
    Ticker,
    Name,
    Close,
    ChangeRate,
    TradedValue,
}

impl FromStr for SortColumn {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "date" => Ok(SortColumn::Date),
            "ticker" | "code" => Ok(SortColumn::Ticker),
            "name" => Ok(SortColumn::Name),
            "close" => Ok(SortColumn::Close),
            "change_rate" | "rate" => Ok(SortColumn::ChangeRate),
            "traded_value" => Ok(SortColumn::TradedValue),
            other => Err(MarketError::UnknownField(format!("sort column '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortDirection {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(MarketError::UnknownField(format!("sort direction '{other}'"))),
        }
    }
}

/// Post-scan bucket on the MA240 classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaPositionFilter {
    #[default]
    All,
    Above,
    Below,
    /// Rows without a classification
    Unknown,
}

impl MaPositionFilter {
    pub fn matches(&self, position: Option<MaPosition>) -> bool {
        match self {
            MaPositionFilter::All => true,
            MaPositionFilter::Above => position == Some(MaPosition::Above),
            MaPositionFilter::Below => position == Some(MaPosition::Below),
            MaPositionFilter::Unknown => position.is_none(),
        }
    }
}

impl FromStr for MaPositionFilter {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "all" => Ok(MaPositionFilter::All),
            "above" => Ok(MaPositionFilter::Above),
            "below" => Ok(MaPositionFilter::Below),
            "unknown" | "none" => Ok(MaPositionFilter::Unknown),
            other => Err(MarketError::UnknownField(format!("ma position '{other}'"))),
        }
    }
}
