//! Configuration module for rentcache.
//!
//! Loads configuration from environment variables.

use std::env;
use std::time::Duration;

use anyhow::{Context, bail};
use url::Url;

use crate::cache::{CacheConfig, DEFAULT_SWEEP_INTERVAL, DEFAULT_TTL};

/// Which booking API implementation to talk to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ApiMode {
    #[default]
    Stub,
    Http,
}

/// Where cached responses are kept
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CacheBackendKind {
    #[default]
    Memory,
    Mongodb,
    Off,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    // Booking services
    pub api_mode: ApiMode,
    pub auth_base_url: Url,
    pub booking_base_url: Url,
    /// Artificial latency of the stub client.
    pub stub_delay: Duration,

    // Cache
    pub cache_backend: CacheBackendKind,
    pub cache: CacheConfig,

    // MongoDB (only needed for the mongodb cache backend)
    pub mongodb_uri: Option<String>,
    pub mongodb_database: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_mode: ApiMode::default(),
            auth_base_url: local_url(8081),
            booking_base_url: local_url(8082),
            stub_delay: Duration::ZERO,
            cache_backend: CacheBackendKind::default(),
            cache: CacheConfig::default(),
            mongodb_uri: None,
            mongodb_database: "rentcache".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Reads `.env` first if present.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let api_mode = match var("API_MODE").as_deref() {
            None | Some("stub") => ApiMode::Stub,
            Some("http") => ApiMode::Http,
            Some(other) => bail!("API_MODE must be 'stub' or 'http', got '{other}'"),
        };

        let cache_backend = match var("CACHE_BACKEND").as_deref() {
            None | Some("memory") => CacheBackendKind::Memory,
            Some("mongodb") | Some("mongo") => CacheBackendKind::Mongodb,
            Some("off") | Some("none") => CacheBackendKind::Off,
            Some(other) => {
                bail!("CACHE_BACKEND must be 'memory', 'mongodb' or 'off', got '{other}'")
            }
        };

        let mongodb_uri = env::var("MONGODB_URI").ok().filter(|s| !s.trim().is_empty());
        if cache_backend == CacheBackendKind::Mongodb && mongodb_uri.is_none() {
            bail!("MONGODB_URI must be set when CACHE_BACKEND is mongodb");
        }

        let ttl = seconds("CACHE_TTL_SECONDS")?.unwrap_or(DEFAULT_TTL);
        let sweep_interval =
            seconds("CACHE_SWEEP_INTERVAL_SECONDS")?.unwrap_or(DEFAULT_SWEEP_INTERVAL);

        Ok(Self {
            api_mode,
            auth_base_url: base_url("AUTH_BASE_URL", 8081)?,
            booking_base_url: base_url("BOOKING_BASE_URL", 8082)?,
            stub_delay: seconds("STUB_DELAY_SECONDS")?.unwrap_or(Duration::from_secs(1)),
            cache_backend,
            cache: CacheConfig::default()
                .ttl(ttl)
                .sweep_interval(sweep_interval),
            mongodb_uri,
            mongodb_database: env::var("MONGODB_DATABASE")
                .unwrap_or_else(|_| "rentcache".to_string()),
        })
    }
}

/// Lowercased, trimmed value of a variable; `None` when unset or blank.
fn var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
}

/// Fractional seconds, e.g. `1.5`.
fn seconds(name: &str) -> anyhow::Result<Option<Duration>> {
    let Some(raw) = var(name) else {
        return Ok(None);
    };
    let secs: f64 = raw
        .parse()
        .with_context(|| format!("{name} must be a number of seconds, got '{raw}'"))?;
    Duration::try_from_secs_f64(secs)
        .map(Some)
        .with_context(|| format!("{name} must be a non-negative number of seconds"))
}

fn base_url(name: &str, default_port: u16) -> anyhow::Result<Url> {
    match env::var(name).ok().filter(|s| !s.trim().is_empty()) {
        Some(raw) => parse_base_url(&raw).with_context(|| format!("Invalid {name}")),
        None => Ok(local_url(default_port)),
    }
}

/// Parse `host[:port][/path]`, assuming `http://` when no scheme is given.
pub fn parse_base_url(raw: &str) -> anyhow::Result<Url> {
    let raw = raw.trim();
    let with_scheme = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("http://{raw}")
    };
    let url = Url::parse(&with_scheme).with_context(|| format!("'{raw}' is not a valid URL"))?;
    if url.host_str().is_none() {
        bail!("'{raw}' has no host");
    }
    Ok(url)
}

fn local_url(port: u16) -> Url {
    Url::parse(&format!("http://localhost:{port}")).expect("localhost URL is valid")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_base_url_adds_scheme() {
        let url = parse_base_url("localhost:8080").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/");

        let url = parse_base_url(" https://api.example.com/v1 ").unwrap();
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.path(), "/v1");
    }

    #[test]
    fn test_parse_base_url_rejects_garbage() {
        assert!(parse_base_url("http://").is_err());
        assert!(parse_base_url("exa mple:80").is_err());
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.api_mode, ApiMode::Stub);
        assert_eq!(config.cache_backend, CacheBackendKind::Memory);
        assert_eq!(config.cache.ttl, DEFAULT_TTL);
        assert_eq!(config.auth_base_url.port(), Some(8081));
        assert_eq!(config.booking_base_url.as_str(), "http://localhost:8082/");
    }
}
