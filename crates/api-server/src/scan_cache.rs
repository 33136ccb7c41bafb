use chrono::{DateTime, Utc};
use dashmap::DashMap;
use gap_screener::{GapQuery, GapScan};
use market_core::Market;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;

struct CacheEntry {
    scan: Arc<GapScan>,
    cached_at: DateTime<Utc>,
}

/// Finished gap scans keyed by query content, market and snapshot version.
///
/// A new snapshot version changes every key, so reloaded data is never served
/// from an older scan.
pub struct ScanCache {
    entries: DashMap<String, CacheEntry>,
    ttl_secs: i64,
}

impl ScanCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl_secs: i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX),
        }
    }

    /// SHA-256 (hex) of the normalized query plus market and snapshot version
    pub fn key(market: Market, version: u64, query: &GapQuery) -> Result<String, serde_json::Error> {
        let body = serde_json::to_vec(query)?;
        let mut hasher = Sha256::new();
        hasher.update(market.as_str().as_bytes());
        hasher.update(version.to_le_bytes());
        hasher.update(&body);
        Ok(hex::encode(hasher.finalize()))
    }

    pub fn get(&self, key: &str) -> Option<Arc<GapScan>> {
        let expired = match self.entries.get(key) {
            Some(entry) if self.is_fresh(entry.cached_at) => return Some(Arc::clone(&entry.scan)),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries.remove(key);
        }
        None
    }

    pub fn insert(&self, key: String, scan: Arc<GapScan>) {
        self.entries.insert(
            key,
            CacheEntry {
                scan,
                cached_at: Utc::now(),
            },
        );
    }

    /// Drop expired entries, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| self.is_fresh(entry.cached_at));
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn is_fresh(&self, cached_at: DateTime<Utc>) -> bool {
        (Utc::now() - cached_at).num_seconds() < self.ttl_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use market_core::{BaseField, CompareField};

    fn query(min_rate: f64) -> GapQuery {
        let day = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        GapQuery::new(day, day, BaseField::PrevClose, CompareField::Open, min_rate, 99999.0)
    }

    #[test]
    fn test_key_depends_on_every_part() {
        let base = ScanCache::key(Market::Kr, 1, &query(3.0)).unwrap();
        assert_eq!(base.len(), 64);
        assert_eq!(base, ScanCache::key(Market::Kr, 1, &query(3.0)).unwrap());
        assert_ne!(base, ScanCache::key(Market::Us, 1, &query(3.0)).unwrap());
        assert_ne!(base, ScanCache::key(Market::Kr, 2, &query(3.0)).unwrap());
        assert_ne!(base, ScanCache::key(Market::Kr, 1, &query(4.0)).unwrap());
    }

    #[test]
    fn test_ticker_filter_is_normalized() {
        let a = query(3.0).with_ticker_filter(" aapl ");
        let b = query(3.0).with_ticker_filter("AAPL");
        assert_eq!(
            ScanCache::key(Market::Us, 1, &a).unwrap(),
            ScanCache::key(Market::Us, 1, &b).unwrap()
        );
    }

    #[test]
    fn test_get_and_expiry() {
        let cache = ScanCache::new(Duration::from_secs(300));
        cache.insert("k".into(), Arc::new(GapScan::default()));
        assert!(cache.get("k").is_some());
        assert!(cache.get("missing").is_none());

        let expired = ScanCache::new(Duration::from_secs(0));
        expired.insert("k".into(), Arc::new(GapScan::default()));
        assert!(expired.get("k").is_none());
        assert!(expired.is_empty());

        expired.insert("k".into(), Arc::new(GapScan::default()));
        assert_eq!(expired.purge_expired(), 1);
    }
}
