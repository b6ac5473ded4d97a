//! Command-line interface parsing for the nisab proxy
//!
//! Handles the `serve` and `lookup` commands and folds command-line and
//! environment overrides into the loaded [`ProxyConfig`].

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

use crate::config::{ConfigError, ProxyConfig};

/// Error types for CLI handling
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The given upstream URL is not an absolute http(s) URL
    #[error("Invalid upstream URL: '{0}'. Expected an http:// or https:// URL")]
    InvalidUpstreamUrl(String),
}

/// Nisab proxy - cached zakat nisab thresholds with an offline fallback
#[derive(Parser, Debug)]
#[command(name = "nisab-proxy")]
#[command(about = "Caching proxy for zakat nisab thresholds")]
#[command(version)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "nisab-proxy.toml", global = true)]
    pub config: PathBuf,

    /// Address the HTTP server listens on (overrides config file)
    #[arg(long, env = "NISAB_BIND", global = true)]
    pub bind: Option<SocketAddr>,

    /// Directory for cache files (overrides config file)
    #[arg(long, env = "NISAB_CACHE_DIR", global = true)]
    pub cache_dir: Option<PathBuf>,

    /// IslamicAPI credential (overrides config file)
    #[arg(long, env = "NISAB_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    /// Upstream nisab endpoint (overrides config file)
    #[arg(long, env = "NISAB_UPSTREAM_URL", global = true)]
    pub upstream_url: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the HTTP proxy (default)
    Serve,
    /// Resolve one entry and print it as JSON
    ///
    /// Examples:
    ///   nisab-proxy lookup --currency usd
    ///   nisab-proxy lookup --currency gbp --standard common
    Lookup {
        /// Currency code; unsupported codes fall back to NGN
        #[arg(long)]
        currency: Option<String>,
        /// classical or common; anything else falls back to classical
        #[arg(long)]
        standard: Option<String>,
    },
}

impl Cli {
    /// The command to run, `serve` when none was given
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve)
    }

    /// Loads the config file and applies the overrides from this invocation.
    ///
    /// # Returns
    /// * `Ok(ProxyConfig)` with overrides applied
    /// * `Err(CliError)` if the config file is invalid or the upstream URL is malformed
    pub fn resolve_config(&self) -> Result<ProxyConfig, CliError> {
        let config = ProxyConfig::load(&self.config)?;
        self.apply_overrides(config)
    }

    pub fn apply_overrides(&self, mut config: ProxyConfig) -> Result<ProxyConfig, CliError> {
        if let Some(dir) = &self.cache_dir {
            config.cache.dir = Some(dir.clone());
        }
        if let Some(api_key) = &self.api_key {
            config.upstream.api_key = api_key.clone();
        }
        if let Some(url) = &self.upstream_url {
            config.upstream.base_url = parse_upstream_url(url)?;
        }
        if let Some(bind) = self.bind {
            config.server.bind = bind;
        }
        Ok(config)
    }
}

/// Checks that an upstream URL is absolute http(s)
pub fn parse_upstream_url(s: &str) -> Result<String, CliError> {
    let url = s.trim();
    let valid = reqwest::Url::parse(url)
        .map(|u| matches!(u.scheme(), "http" | "https"))
        .unwrap_or(false);
    if valid {
        Ok(url.to_string())
    } else {
        Err(CliError::InvalidUpstreamUrl(s.to_string()))
    }
}
