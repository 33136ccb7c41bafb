use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use market_core::{Market, MarketError};
use market_screens::{
    ChartHistory, ConsecutiveRiseStock, DayLists, FrequentStock, MarketScreener, PullbackStock,
    ScreenCategory, SymbolMatch, TradingCalendar,
};
use serde::{Deserialize, Serialize};

use crate::{ApiResponse, AppError, AppState};

// ---------------------------------------------------------------------------
// Query params
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct DateParams {
    pub date: String,
}

#[derive(Debug, Deserialize)]
pub struct FrequentParams {
    pub date: String,
    #[serde(default = "default_weeks")]
    pub weeks: usize,
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PullbackParams {
    pub date: String,
    #[serde(default = "default_days_ago")]
    pub days_ago: usize,
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ConsecutiveParams {
    pub date: String,
    #[serde(default = "default_streak_days")]
    pub days: usize,
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    #[serde(alias = "ticker")]
    pub code: String,
    #[serde(default = "default_history_days")]
    pub days: usize,
    pub end_date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_search_limit")]
    pub limit: usize,
}

fn default_weeks() -> usize {
    4
}
fn default_days_ago() -> usize {
    1
}
fn default_streak_days() -> usize {
    2
}
fn default_history_days() -> usize {
    90
}
fn default_search_limit() -> usize {
    50
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketHealth {
    pub rows: usize,
    pub tickers: usize,
    pub trading_days: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub snapshot_version: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub kr: MarketHealth,
    pub us: MarketHealth,
    pub cached_scans: usize,
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

/// `YYYY-MM-DD` only
pub(crate) fn parse_date(field: &str, value: &str) -> Result<NaiveDate, MarketError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| MarketError::InvalidQuery(format!("{field} '{value}' is not a YYYY-MM-DD date")))
}

fn category(market: Market, raw: Option<&str>) -> ScreenCategory {
    match raw.map(str::trim).filter(|c| !c.is_empty()) {
        Some(c) => ScreenCategory::parse(market, c),
        None => ScreenCategory::default_for(market),
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn get_dates(
    State(state): State<AppState>,
    Path(market): Path<Market>,
) -> Json<ApiResponse<TradingCalendar>> {
    let snapshot = state.store(market).snapshot();
    Json(ApiResponse::success(MarketScreener::new(market, &snapshot).calendar()))
}

async fn get_day_data(
    State(state): State<AppState>,
    Path(market): Path<Market>,
    Query(params): Query<DateParams>,
) -> Result<Json<ApiResponse<DayLists>>, AppError> {
    let date = parse_date("date", &params.date)?;
    let snapshot = state.store(market).snapshot();
    Ok(Json(ApiResponse::success(
        MarketScreener::new(market, &snapshot).day_lists(date),
    )))
}

async fn get_frequent(
    State(state): State<AppState>,
    Path(market): Path<Market>,
    Query(params): Query<FrequentParams>,
) -> Result<Json<ApiResponse<Vec<FrequentStock>>>, AppError> {
    let date = parse_date("date", &params.date)?;
    if params.weeks == 0 {
        return Err(MarketError::InvalidQuery("weeks must be at least 1".into()).into());
    }
    let category = category(market, params.category.as_deref());
    let snapshot = state.store(market).snapshot();
    Ok(Json(ApiResponse::success(
        MarketScreener::new(market, &snapshot).frequent(date, params.weeks, category),
    )))
}

async fn get_pullback(
    State(state): State<AppState>,
    Path(market): Path<Market>,
    Query(params): Query<PullbackParams>,
) -> Result<Json<ApiResponse<Vec<PullbackStock>>>, AppError> {
    let date = parse_date("date", &params.date)?;
    let category = category(market, params.category.as_deref());
    let snapshot = state.store(market).snapshot();
    Ok(Json(ApiResponse::success(
        MarketScreener::new(market, &snapshot).pullback(date, params.days_ago, category),
    )))
}

async fn get_consecutive(
    State(state): State<AppState>,
    Path(market): Path<Market>,
    Query(params): Query<ConsecutiveParams>,
) -> Result<Json<ApiResponse<Vec<ConsecutiveRiseStock>>>, AppError> {
    let date = parse_date("date", &params.date)?;
    if params.days == 0 {
        return Err(MarketError::InvalidQuery("days must be at least 1".into()).into());
    }
    let category = category(market, params.category.as_deref());
    let snapshot = state.store(market).snapshot();
    Ok(Json(ApiResponse::success(
        MarketScreener::new(market, &snapshot).consecutive_rise(date, params.days, category),
    )))
}

async fn get_history(
    State(state): State<AppState>,
    Path(market): Path<Market>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<ApiResponse<ChartHistory>>, AppError> {
    let end_date = match params.end_date.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => Some(parse_date("end_date", raw)?),
        _ => None,
    };
    let snapshot = state.store(market).snapshot();
    Ok(Json(ApiResponse::success(
        MarketScreener::new(market, &snapshot).history(params.code.trim(), params.days, end_date),
    )))
}

async fn search(
    State(state): State<AppState>,
    Path(market): Path<Market>,
    Query(params): Query<SearchParams>,
) -> Json<ApiResponse<Vec<SymbolMatch>>> {
    let snapshot = state.store(market).snapshot();
    Json(ApiResponse::success(
        MarketScreener::new(market, &snapshot).search(&params.q, params.limit),
    ))
}

async fn health(State(state): State<AppState>) -> Json<ApiResponse<HealthStatus>> {
    let market_health = |market: Market| {
        let snapshot = state.store(market).snapshot();
        let stats = snapshot.stats();
        MarketHealth {
            rows: stats.rows,
            tickers: stats.tickers,
            trading_days: stats.trading_days,
            first_date: stats.first_date,
            last_date: stats.last_date,
            snapshot_version: snapshot.version(),
        }
    };

    Json(ApiResponse::success(HealthStatus {
        status: "ok".to_string(),
        kr: market_health(Market::Kr),
        us: market_health(Market::Us),
        cached_scans: state.scan_cache.len(),
    }))
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/:market/dates", get(get_dates))
        .route("/api/:market/data", get(get_day_data))
        .route("/api/:market/frequent", get(get_frequent))
        .route("/api/:market/pullback", get(get_pullback))
        .route("/api/:market/consecutive", get(get_consecutive))
        .route("/api/:market/history", get(get_history))
        .route("/api/:market/search", get(search))
}
