//! Proxy configuration
//!
//! Built once at startup from an optional TOML file plus command-line/env
//! overrides, then shared read-only behind an `Arc`.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::cache::CacheManager;
use crate::data::upstream::ISLAMIC_API_BASE_URL;
use crate::data::FallbackPriceTable;

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config file {path}: cache.max_age_secs must be at most {max}, got {value}")]
    MaxAgeOutOfRange { path: String, value: u64, max: u64 },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProxyConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub fallback: FallbackPriceTable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP server binds to
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// IslamicAPI nisab endpoint
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// API credential
    #[serde(default)]
    pub api_key: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Which store backs the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    #[default]
    File,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub backend: CacheBackend,

    /// Directory for cache files; platform cache dir when unset
    #[serde(default)]
    pub dir: Option<PathBuf>,

    /// Freshness window in seconds
    #[serde(default = "default_max_age_secs")]
    pub max_age_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::default(),
            dir: None,
            max_age_secs: default_max_age_secs(),
        }
    }
}

/// Largest freshness window a `chrono::Duration` can hold (it counts milliseconds in an i64)
pub const MAX_AGE_LIMIT_SECS: u64 = (i64::MAX / 1000) as u64;

impl CacheConfig {
    /// Freshness window, clamped to [`MAX_AGE_LIMIT_SECS`]
    pub fn max_age(&self) -> chrono::Duration {
        let secs = self.max_age_secs.min(MAX_AGE_LIMIT_SECS);
        chrono::Duration::seconds(secs as i64)
    }

    /// Configured directory, else the XDG cache dir, else `./cache`
    pub fn resolved_dir(&self) -> PathBuf {
        self.dir
            .clone()
            .or_else(|| CacheManager::new().map(|m| m.cache_dir().clone()))
            .unwrap_or_else(|| PathBuf::from("cache"))
    }
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

fn default_base_url() -> String {
    ISLAMIC_API_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_max_age_secs() -> u64 {
    21600
}

impl ProxyConfig {
    /// Loads a TOML config file; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        if config.cache.max_age_secs > MAX_AGE_LIMIT_SECS {
            return Err(ConfigError::MaxAgeOutOfRange {
                path: path.display().to_string(),
                value: config.cache.max_age_secs,
                max: MAX_AGE_LIMIT_SECS,
            });
        }
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = ProxyConfig::default();
        assert_eq!(config.server.bind.port(), 8080);
        assert_eq!(config.upstream.base_url, ISLAMIC_API_BASE_URL);
        assert_eq!(config.upstream.timeout(), Duration::from_secs(10));
        assert_eq!(config.cache.max_age(), chrono::Duration::hours(6));
        assert_eq!(config.cache.backend, CacheBackend::File);
        assert_eq!(config.fallback, FallbackPriceTable::default());
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config = ProxyConfig::from_toml("").unwrap();
        assert_eq!(config.upstream.timeout_secs, 10);
        assert_eq!(config.cache.max_age_secs, 21600);
    }

    #[test]
    fn test_partial_toml() {
        let config = ProxyConfig::from_toml(
            r#"
[server]
bind = "0.0.0.0:9000"

[upstream]
api_key = "secret"
timeout_secs = 3

[cache]
backend = "memory"
dir = "/var/cache/nisab"

[fallback]
gold_usd_per_gram = 70.0

[fallback.exchange_rates]
USD = 1.0
NGN = 1500.0
"#,
        )
        .unwrap();

        assert_eq!(config.server.bind.port(), 9000);
        assert_eq!(config.upstream.api_key, "secret");
        assert_eq!(config.upstream.timeout_secs, 3);
        assert_eq!(config.upstream.base_url, ISLAMIC_API_BASE_URL);
        assert_eq!(config.cache.backend, CacheBackend::Memory);
        assert_eq!(config.cache.resolved_dir(), PathBuf::from("/var/cache/nisab"));
        assert_eq!(config.fallback.gold_usd_per_gram, 70.0);
        assert_eq!(config.fallback.silver_usd_per_gram, 0.85);
        assert_eq!(config.fallback.rate_for("NGN"), 1500.0);
        assert_eq!(config.fallback.rate_for("EUR"), 1.0);
        assert_eq!(config.fallback.weights.len(), 2);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = ProxyConfig::load(&temp_dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.server.bind, default_bind());
    }

    #[test]
    fn test_load_invalid_file_reports_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bad.toml");
        std::fs::write(&path, "[upstream\ntimeout_secs = ").unwrap();

        let err = ProxyConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("bad.toml"));
    }

    #[test]
    fn test_load_rejects_oversized_max_age() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("huge.toml");
        std::fs::write(&path, "[cache]\nmax_age_secs = 9223372036854775807\n").unwrap();

        let err = ProxyConfig::load(&path).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MaxAgeOutOfRange { value: 9223372036854775807, .. }
        ));
        assert!(err.to_string().contains("max_age_secs"));
    }

    #[test]
    fn test_max_age_clamps_huge_values() {
        let cache = CacheConfig {
            max_age_secs: u64::MAX,
            ..CacheConfig::default()
        };
        let max_age = cache.max_age();
        assert_eq!(max_age, chrono::Duration::seconds(MAX_AGE_LIMIT_SECS as i64));
        assert!(max_age > chrono::Duration::zero());

        let limit = CacheConfig {
            max_age_secs: MAX_AGE_LIMIT_SECS,
            ..CacheConfig::default()
        };
        assert_eq!(limit.max_age(), max_age);
    }
}
