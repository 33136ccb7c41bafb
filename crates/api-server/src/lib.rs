//! Stock dashboard HTTP server
//!
//! Serves the Korean and US markets from in-memory snapshots loaded at start-up.
//! Every market route lives under `/api/{kr,us}`.

use anyhow::Context;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    Json, Router,
};
use market_core::{Market, MarketError};
use price_store::PriceStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod config;
pub mod gap_routes;
pub mod market_routes;
pub mod request_id;
pub mod scan_cache;

pub use config::ServerConfig;
pub use scan_cache::ScanCache;


const DEFAULT_LOG_FILTER: &str = "api_server=info,price_store=info,gap_screener=info";

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AppState {
    pub kr: Arc<PriceStore>,
    pub us: Arc<PriceStore>,
    pub scan_cache: Arc<ScanCache>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            kr: Arc::new(PriceStore::new(Market::Kr)),
            us: Arc::new(PriceStore::new(Market::Us)),
            scan_cache: Arc::new(ScanCache::new(config.scan_cache_ttl)),
            config: Arc::new(config),
        }
    }

    pub fn store(&self, market: Market) -> &Arc<PriceStore> {
        match market {
            Market::Kr => &self.kr,
            Market::Us => &self.us,
        }
    }

    /// Load both markets from their configured files
    pub fn load_data(&self) -> Result<(), MarketError> {
        for market in [Market::Kr, Market::Us] {
            self.store(market)
                .load_file(self.config.data_file(market))
                .map_err(|err| {
                    MarketError::Ingest(format!("{} market: {err}", market.as_str().to_uppercase()))
                })?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Response envelope and errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    /// Set on error envelopes so a client report can be matched to the logs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            request_id: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            request_id: request_id::current_request_id(),
        }
    }
}

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    error: anyhow::Error,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

/// Status code for a domain error
fn market_error_status(err: &MarketError) -> StatusCode {
    match err {
        MarketError::Cancelled => StatusCode::REQUEST_TIMEOUT,
        e if e.is_client_error() => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let error = err.into();
        let status = error
            .downcast_ref::<MarketError>()
            .map(market_error_status)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self { status, error }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ApiResponse::<()>::error(self.error.to_string());
        let request_id = body.request_id.as_deref().unwrap_or("-");
        if self.status.is_server_error() {
            tracing::error!("[{}] Request failed: {:#}", request_id, self.error);
        } else {
            tracing::warn!("[{}] Request rejected ({}): {}", request_id, self.status, self.error);
        }
        (self.status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Router and server
// ---------------------------------------------------------------------------

pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let cors = state.config.cors_layer()?;
    let trace = TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
        tracing::info_span!(
            "http",
            method = %request.method(),
            uri = %request.uri(),
            request_id = tracing::field::Empty,
        )
    });

    Ok(Router::new()
        .merge(market_routes::router())
        .merge(gap_routes::router())
        .layer(middleware::from_fn(request_id::request_id_middleware))
        .layer(trace)
        .layer(cors)
        .with_state(state))
}

/// Logging for the binary: `RUST_LOG` filter, JSON lines when `RUST_LOG_FORMAT=json`
pub fn init_tracing() {
    let filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER))
    };
    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json_logging {
        tracing_subscriber::fmt().json().with_env_filter(filter()).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter()).init();
    }
}

pub async fn run_server() -> anyhow::Result<()> {
    let config = ServerConfig::from_env()?;
    tracing::info!("Starting stock dashboard server");
    tracing::info!("  Bind address: {}", config.bind_addr);
    tracing::info!("  Scan timeout: {}s", config.scan_timeout.as_secs());
    tracing::info!("  Scan cache TTL: {}s", config.scan_cache_ttl.as_secs());

    let bind_addr = config.bind_addr;
    let state = AppState::new(config);

    let loader = state.clone();
    tokio::task::spawn_blocking(move || loader.load_data())
        .await
        .context("data loading task failed")??;

    spawn_cache_janitor(Arc::clone(&state.scan_cache), state.config.scan_cache_ttl);

    let app = build_router(state)?;
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    tracing::info!("🚀 Listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Periodically drop expired scan results
fn spawn_cache_janitor(cache: Arc<ScanCache>, ttl: std::time::Duration) {
    let period = ttl.max(std::time::Duration::from_secs(1));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            let removed = cache.purge_expired();
            if removed > 0 {
                tracing::debug!("Purged {} expired scan results", removed);
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("Shutdown signal received");
}
