use async_trait::async_trait;
use signal_core::{Quote, QuoteProvider, SignalError};
use std::collections::HashMap;
use std::path::Path;

/// Serves a fixed set of quotes keyed by symbol.
///
/// Used for offline runs (`--quotes-file`) and tests. Requests return the
/// symbols it knows, in request order.
#[derive(Debug, Clone, Default)]
pub struct SnapshotQuoteProvider {
    quotes: HashMap<String, Quote>,
}

impl SnapshotQuoteProvider {
    pub fn new(quotes: Vec<Quote>) -> Self {
        let quotes = quotes.into_iter().map(|q| (q.symbol.clone(), q)).collect();
        Self { quotes }
    }

    /// Parse a JSON array of quotes (camelCase fields).
    pub fn from_json_str(json: &str) -> Result<Self, SignalError> {
        let quotes: Vec<Quote> = serde_json::from_str(json)
            .map_err(|e| SignalError::Config(format!("Invalid quotes JSON: {}", e)))?;
        Ok(Self::new(quotes))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SignalError> {
        let path = path.as_ref();
        let body = std::fs::read_to_string(path)
            .map_err(|e| SignalError::Config(format!("Cannot read {}: {}", path.display(), e)))?;
        Self::from_json_str(&body)
    }

    /// Add or replace the quote for its symbol.
    pub fn insert(&mut self, quote: Quote) {
        self.quotes.insert(quote.symbol.clone(), quote);
    }

    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.quotes.keys().cloned().collect();
        symbols.sort();
        symbols
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }
}

#[async_trait]
impl QuoteProvider for SnapshotQuoteProvider {
    async fn fetch_quotes(&self, symbols: &[String]) -> Result<Vec<Quote>, SignalError> {
        Ok(symbols
            .iter()
            .filter_map(|s| self.quotes.get(s).cloned())
            .collect())
    }

    fn name(&self) -> &str {
        "snapshot"
    }
}
