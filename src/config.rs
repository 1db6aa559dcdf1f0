//! # config: Config from Environment Variables
//!
//! | Variable             | Default                  |
//! |----------------------|--------------------------|
//! | `WOLFEE_API_URL`     | `http://localhost:8000`  |
//! | `QUICK_PATH`         | `/api/market-data/quick` |
//! | `FULL_PATH`          | `/api/market-data/full`  |
//! | `QUICK_TIMEOUT_SECS` | `30`                     |
//! | `CACHE_TTL_SECS`     | `300`                    |
//! | `BIND_ADDR`          | `127.0.0.1:3000`         |
//! | `PORTFOLIO_PATH`     | `wolfee_portfolio.json`  |
//! | `DOWNLOAD_DIR`       | `.`                      |
//! | `EXPORT_RESET_SECS`  | `3`                      |

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;

/// Everything the dashboard client needs to start.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the analytics API, fixed per deployment
    pub api_base_url:  String,
    /// Quick-stage endpoint (`/stocks` on older deployments)
    pub quick_path:    String,
    pub full_path:     String,
    /// Budget for the quick stage; the full stage has none
    pub quick_timeout: Duration,
    pub cache_ttl:     Duration,
    /// Where the local dashboard surface listens
    pub bind_addr:     SocketAddr,
    pub portfolio_path: PathBuf,
    pub download_dir:  PathBuf,
    /// How long a failed-export indicator stays up
    pub export_reset:  Duration,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Config::from_env`] but reading through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let secs = |key: &str, default: &str| -> anyhow::Result<Duration> {
            let secs: u64 = var(key, default)
                .trim()
                .parse()
                .with_context(|| format!("{key} must be a whole number of seconds"))?;
            Ok(Duration::from_secs(secs))
        };

        let bind_addr = var("BIND_ADDR", "127.0.0.1:3000")
            .parse()
            .context("BIND_ADDR must be host:port")?;

        Ok(Self {
            api_base_url:   var("WOLFEE_API_URL", "http://localhost:8000"),
            quick_path:     var("QUICK_PATH", "/api/market-data/quick"),
            full_path:      var("FULL_PATH", "/api/market-data/full"),
            quick_timeout:  secs("QUICK_TIMEOUT_SECS", "30")?,
            cache_ttl:      secs("CACHE_TTL_SECS", "300")?,
            bind_addr,
            portfolio_path: PathBuf::from(var("PORTFOLIO_PATH", "wolfee_portfolio.json")),
            download_dir:   PathBuf::from(var("DOWNLOAD_DIR", ".")),
            export_reset:   secs("EXPORT_RESET_SECS", "3")?,
        })
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
