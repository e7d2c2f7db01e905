use std::path::PathBuf;
use std::time::Duration;

use crate::sectors::default_symbols;

/// Refresh worker settings, read from the environment (after `.env` is loaded).
#[derive(Debug, Clone)]
pub struct RefreshConfig {
    pub symbols: Vec<String>,
    pub interval: Duration,
    pub batch_size: usize,
    pub fetch_timeout: Duration,
    pub concurrency: usize,
    /// SQLite URL; the in-memory store is used when unset.
    pub database_url: Option<String>,
    /// Serve quotes from this JSON file instead of the live API.
    pub quotes_file: Option<PathBuf>,
    pub yahoo_base_url: Option<String>,
    pub symbol_suffix: Option<String>,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            symbols: default_symbols(),
            interval: Duration::from_secs(60),
            batch_size: 10,
            fetch_timeout: Duration::from_secs(30),
            concurrency: 4,
            database_url: None,
            quotes_file: None,
            yahoo_base_url: None,
            symbol_suffix: None,
        }
    }
}

impl RefreshConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset, empty or unparsable values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let symbols: Vec<String> = var("REFRESH_SYMBOLS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            symbols: if symbols.is_empty() { defaults.symbols } else { symbols },
            interval: var("REFRESH_INTERVAL_SECS")
                .and_then(|s| s.parse().ok())
                .filter(|secs: &u64| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.interval),
            batch_size: var("QUOTE_BATCH_SIZE")
                .and_then(|s| s.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.batch_size),
            fetch_timeout: var("QUOTE_FETCH_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .filter(|secs: &u64| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.fetch_timeout),
            concurrency: var("REFRESH_CONCURRENCY")
                .and_then(|s| s.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.concurrency),
            database_url: var("DATABASE_URL"),
            quotes_file: var("QUOTES_FILE").map(PathBuf::from),
            yahoo_base_url: var("YAHOO_BASE_URL"),
            symbol_suffix: lookup("SYMBOL_SUFFIX").map(|v| v.trim().to_string()),
        }
    }
}
