use anyhow::{Context, Result};
use axum::http::{HeaderValue, Method};
use market_core::Market;
use std::env;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub kr_data_file: PathBuf,
    pub us_data_file: PathBuf,
    /// A gap scan still running after this long is cancelled
    pub scan_timeout: Duration,
    pub scan_cache_ttl: Duration,
    /// Empty means any origin
    pub cors_allow_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 7002)),
            kr_data_file: PathBuf::from("data/kr_stock_data.csv"),
            us_data_file: PathBuf::from("data/us_stock_data.csv"),
            scan_timeout: Duration::from_secs(30),
            scan_cache_ttl: Duration::from_secs(300),
            cors_allow_origins: Vec::new(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from any key lookup (environment in production)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let config = Self {
            bind_addr: var("BIND_ADDR", "0.0.0.0:7002")
                .parse()
                .context("BIND_ADDR must be host:port")?,
            kr_data_file: PathBuf::from(var("KR_DATA_FILE", "data/kr_stock_data.csv")),
            us_data_file: PathBuf::from(var("US_DATA_FILE", "data/us_stock_data.csv")),
            scan_timeout: Duration::from_secs(
                var("SCAN_TIMEOUT_SECS", "30")
                    .parse()
                    .context("SCAN_TIMEOUT_SECS must be a whole number of seconds")?,
            ),
            scan_cache_ttl: Duration::from_secs(
                var("SCAN_CACHE_TTL_SECS", "300")
                    .parse()
                    .context("SCAN_CACHE_TTL_SECS must be a whole number of seconds")?,
            ),
            cors_allow_origins: var("CORS_ALLOW_ORIGINS", "*")
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty() && *o != "*")
                .map(str::to_string)
                .collect(),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn data_file(&self, market: Market) -> &Path {
        match market {
            Market::Kr => &self.kr_data_file,
            Market::Us => &self.us_data_file,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.scan_timeout.is_zero() {
            anyhow::bail!("SCAN_TIMEOUT_SECS must be greater than zero");
        }
        Ok(())
    }

    pub fn cors_layer(&self) -> Result<CorsLayer> {
        let origin = if self.cors_allow_origins.is_empty() {
            AllowOrigin::from(Any)
        } else {
            let origins = self
                .cors_allow_origins
                .iter()
                .map(|o| HeaderValue::from_str(o).with_context(|| format!("invalid CORS origin '{o}'")))
                .collect::<Result<Vec<_>>>()?;
            AllowOrigin::list(origins)
        };

        Ok(CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::OPTIONS])
            .allow_headers(Any))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.bind_addr.port(), 7002);
        assert_eq!(config.scan_timeout, Duration::from_secs(30));
        assert_eq!(config.scan_cache_ttl, Duration::from_secs(300));
        assert!(config.cors_allow_origins.is_empty());
        assert_eq!(config.kr_data_file, PathBuf::from("data/kr_stock_data.csv"));
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("BIND_ADDR", "127.0.0.1:9000"),
            ("SCAN_TIMEOUT_SECS", "5"),
            ("CORS_ALLOW_ORIGINS", "http://localhost:5173, https://example.com"),
        ]))
        .unwrap();
        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.scan_timeout, Duration::from_secs(5));
        assert_eq!(config.cors_allow_origins.len(), 2);
        assert!(config.cors_layer().is_ok());
    }

    #[test]
    fn test_invalid_values() {
        assert!(ServerConfig::from_lookup(lookup(&[("SCAN_TIMEOUT_SECS", "soon")])).is_err());
        assert!(ServerConfig::from_lookup(lookup(&[("SCAN_TIMEOUT_SECS", "0")])).is_err());
        assert!(ServerConfig::from_lookup(lookup(&[("BIND_ADDR", "nowhere")])).is_err());
    }
}
