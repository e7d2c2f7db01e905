use async_trait::async_trait;
use std::collections::HashMap;

use crate::{DerivedSignal, MarketSummary, Quote, SignalError};

/// Source of quotes for a set of tickers (live feed, fixture file, ...).
///
/// Symbols the source does not know are simply absent from the result.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    async fn fetch_quotes(&self, symbols: &[String]) -> Result<Vec<Quote>, SignalError>;

    /// Provider name for logging
    fn name(&self) -> &str;
}

/// Persistence for derived signals and the daily market summary.
#[async_trait]
pub trait SignalStore: Send + Sync {
    /// Upsert keyed by symbol. Each record replaces the previous one wholesale.
    async fn upsert_signals(&self, signals: &[DerivedSignal]) -> Result<(), SignalError>;

    /// Upsert keyed by date; a later run on the same day overwrites.
    async fn upsert_market_summary(&self, summary: &MarketSummary) -> Result<(), SignalError>;

    async fn latest_market_summary(&self) -> Result<Option<MarketSummary>, SignalError>;

    /// All stored signals, ordered by symbol.
    async fn signals(&self) -> Result<Vec<DerivedSignal>, SignalError>;
}

/// Maps a symbol to its sector name.
pub trait SectorLookup {
    fn sector_of(&self, symbol: &str) -> Option<&str>;
}

impl SectorLookup for HashMap<String, String> {
    fn sector_of(&self, symbol: &str) -> Option<&str> {
        self.get(symbol).map(String::as_str)
    }
}

impl SectorLookup for HashMap<&str, &str> {
    fn sector_of(&self, symbol: &str) -> Option<&str> {
        self.get(symbol).copied()
    }
}
