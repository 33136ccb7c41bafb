use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use gap_screener::{
    CancelFlag, Direction, GapQuery, GapScan, GapScanEngine, MaPosition, MaPositionFilter,
    RankOptions, ResultRanker, SortColumn, SortDirection,
};
use market_core::{round_to, BaseField, CompareField, Market, MarketError, PriceBand};
use price_store::PriceSnapshot;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::market_routes::parse_date;
use crate::{ApiResponse, AppError, AppState, ScanCache};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct GapAnalysisParams {
    pub start_date: String,
    pub end_date: String,
    #[serde(default = "default_base_price")]
    pub base_price: String,
    #[serde(default = "default_compare_price")]
    pub compare_price: String,
    #[serde(default = "default_min_rate")]
    pub min_rate: f64,
    #[serde(default = "default_max_rate")]
    pub max_rate: f64,
    pub extra_base: Option<String>,
    pub extra_compare: Option<String>,
    pub extra_direction: Option<String>,
    pub detail_base: Option<String>,
    pub detail_compare: Option<String>,
    pub detail_direction: Option<String>,
    pub ticker_filter: Option<String>,
    pub sort_by: Option<String>,
    pub sort_dir: Option<String>,
    pub price_band: Option<String>,
    pub ma_position: Option<String>,
}

fn default_base_price() -> String {
    "prev_close".into()
}
fn default_compare_price() -> String {
    "open".into()
}
fn default_min_rate() -> f64 {
    3.0
}
fn default_max_rate() -> f64 {
    99999.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GapRow {
    pub date: NaiveDate,
    pub ticker: String,
    pub name: String,
    pub close: f64,
    pub change_rate: f64,
    pub traded_value: f64,
    pub ma240: Option<f64>,
    pub ma_position: Option<MaPosition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GapAnalysisResponse {
    pub market: Market,
    pub results: Vec<GapRow>,
    /// Rows before the price band / MA filters
    pub total_matches: usize,
    pub dates_scanned: usize,
    pub snapshot_version: u64,
    pub cached: bool,
}

// ---------------------------------------------------------------------------
// Param conversion
// ---------------------------------------------------------------------------

/// Blank strings count as absent
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_opt<T: FromStr<Err = MarketError>>(value: &Option<String>) -> Result<Option<T>, MarketError> {
    present(value).map(T::from_str).transpose()
}

impl GapAnalysisParams {
    pub fn to_query(&self) -> Result<GapQuery, MarketError> {
        let start = parse_date("start_date", &self.start_date)?;
        let end = parse_date("end_date", &self.end_date)?;

        let mut query = GapQuery::new(
            start,
            end,
            self.base_price.parse::<BaseField>()?,
            self.compare_price.parse::<CompareField>()?,
            self.min_rate,
            self.max_rate,
        )
        .with_extra(
            parse_opt::<BaseField>(&self.extra_base)?,
            parse_opt::<CompareField>(&self.extra_compare)?,
            parse_opt::<Direction>(&self.extra_direction)?,
        )
        .with_detail(
            parse_opt::<BaseField>(&self.detail_base)?,
            parse_opt::<CompareField>(&self.detail_compare)?,
            parse_opt::<Direction>(&self.detail_direction)?,
        );

        if let Some(filter) = present(&self.ticker_filter) {
            query = query.with_ticker_filter(filter);
        }

        query.validate()?;
        Ok(query)
    }

    pub fn rank_options(&self) -> Result<RankOptions, MarketError> {
        Ok(RankOptions {
            sort_by: parse_opt::<SortColumn>(&self.sort_by)?.unwrap_or_default(),
            direction: parse_opt::<SortDirection>(&self.sort_dir)?.unwrap_or_default(),
            price_band: parse_opt::<PriceBand>(&self.price_band)?.unwrap_or_default(),
            ma_filter: parse_opt::<MaPositionFilter>(&self.ma_position)?.unwrap_or_default(),
        })
    }
}

// ---------------------------------------------------------------------------
// Scan execution
// ---------------------------------------------------------------------------

/// Run the scan off the async runtime, cancelling it once `timeout` elapses
async fn run_scan(
    snapshot: Arc<PriceSnapshot>,
    query: GapQuery,
    timeout: Duration,
) -> Result<GapScan, AppError> {
    let cancel = CancelFlag::new();
    let worker_cancel = cancel.clone();
    let task = tokio::task::spawn_blocking(move || {
        GapScanEngine::new(snapshot.as_ref()).scan_with_cancel(&query, &worker_cancel)
    });

    match tokio::time::timeout(timeout, task).await {
        Ok(joined) => Ok(joined??),
        Err(_) => {
            cancel.cancel();
            tracing::warn!("Gap scan exceeded {}s, cancelling", timeout.as_secs());
            Err(MarketError::Cancelled.into())
        }
    }
}

/// Prices and rates to 2 decimals in both markets, traded value truncated
fn to_row(result: &gap_screener::GapResult) -> GapRow {
    GapRow {
        date: result.date,
        ticker: result.ticker.clone(),
        name: result.name.clone(),
        close: round_to(result.close, 2),
        change_rate: round_to(result.change_rate, 2),
        traded_value: result.traded_value.trunc(),
        ma240: result.ma240.map(|ma| round_to(ma, 2)),
        ma_position: result.ma_position,
    }
}

// ---------------------------------------------------------------------------
// Handler
// ---------------------------------------------------------------------------

async fn gap_analysis(
    State(state): State<AppState>,
    Path(market): Path<Market>,
    Query(params): Query<GapAnalysisParams>,
) -> Result<Json<ApiResponse<GapAnalysisResponse>>, AppError> {
    let query = params.to_query()?;
    let options = params.rank_options()?;

    let snapshot = state.store(market).snapshot();
    let version = snapshot.version();
    let key = ScanCache::key(market, version, &query)?;

    let started = Instant::now();
    let (scan, cached) = match state.scan_cache.get(&key) {
        Some(scan) => (scan, true),
        None => {
            let scan = Arc::new(run_scan(snapshot, query, state.config.scan_timeout).await?);
            state.scan_cache.insert(key, Arc::clone(&scan));
            (scan, false)
        }
    };

    let ranked = ResultRanker::with_options(options).rank(&scan.results);
    tracing::info!(
        "[{}] gap analysis: {} of {} rows after filters ({}, {:.0}ms)",
        market.as_str().to_uppercase(),
        ranked.len(),
        scan.results.len(),
        if cached { "cached" } else { "fresh" },
        started.elapsed().as_secs_f64() * 1000.0
    );

    Ok(Json(ApiResponse::success(GapAnalysisResponse {
        market,
        results: ranked.iter().map(to_row).collect(),
        total_matches: scan.results.len(),
        dates_scanned: scan.dates_scanned,
        snapshot_version: version,
        cached,
    })))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/:market/gap-analysis", get(gap_analysis))
}
