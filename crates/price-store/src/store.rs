use market_core::{DailyPriceRecord, Market};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Instant;

use crate::loader::load_csv;
use crate::snapshot::PriceSnapshot;
use crate::StoreError;

/// Holds the current snapshot of one market.
///
/// Readers take an `Arc` to the snapshot and keep it for the whole operation;
/// writers build a complete replacement and swap the pointer, so a reader
/// sees either the old or the new data, never a mix.
pub struct PriceStore {
    market: Market,
    current: RwLock<Arc<PriceSnapshot>>,
    next_version: AtomicU64,
}

impl PriceStore {
    pub fn new(market: Market) -> Self {
        Self {
            market,
            current: RwLock::new(Arc::new(PriceSnapshot::empty(market))),
            next_version: AtomicU64::new(1),
        }
    }

    /// Current snapshot
    pub fn snapshot(&self) -> Arc<PriceSnapshot> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Replace all data with `records`
    pub fn replace(&self, records: Vec<DailyPriceRecord>, derive_change_rate: bool) -> Arc<PriceSnapshot> {
        let version = self.next_version.fetch_add(1, Ordering::SeqCst);
        let snapshot = Arc::new(PriceSnapshot::build(
            self.market,
            version,
            records,
            derive_change_rate,
        ));
        self.swap(Arc::clone(&snapshot));
        snapshot
    }

    /// Load a CSV file, replacing the current data.
    ///
    /// A missing file is not an error: the market stays empty and a warning is
    /// logged.
    pub fn load_file(&self, path: &Path) -> Result<Arc<PriceSnapshot>, StoreError> {
        let label = self.market.as_str().to_uppercase();
        if !path.exists() {
            tracing::warn!("[{}] data file not found: {}", label, path.display());
            return Ok(self.snapshot());
        }

        let started = Instant::now();
        tracing::info!("[{}] loading {}", label, path.display());

        let loaded = load_csv(path)?;
        if loaded.skipped_rows > 0 {
            tracing::warn!("[{}] skipped {} rows with unreadable dates", label, loaded.skipped_rows);
        }

        let snapshot = self.replace(loaded.records, !loaded.has_change_rate);
        let stats = snapshot.stats();

        match (stats.first_date, stats.last_date) {
            (Some(first), Some(last)) => tracing::info!(
                "[{}] loaded {} rows, {} tickers, {} sessions ({} ~ {}) in {:.2}s",
                label,
                stats.rows,
                stats.tickers,
                stats.trading_days,
                first,
                last,
                started.elapsed().as_secs_f64()
            ),
            _ => tracing::warn!("[{}] data file contained no usable rows", label),
        }

        Ok(snapshot)
    }

    fn swap(&self, snapshot: Arc<PriceSnapshot>) {
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        *guard = snapshot;
    }
}
