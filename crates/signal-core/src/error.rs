use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SignalError {
    /// Quote cannot be scored (non-positive or non-finite price / previous close).
    /// Only that symbol is skipped; the rest of the batch continues.
    #[error("Invalid quote for {symbol}: {reason}")]
    InvalidQuote { symbol: String, reason: String },

    /// Aggregation was asked to summarise zero signals.
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SignalError {
    pub fn invalid_quote(symbol: impl Into<String>, reason: impl Into<String>) -> Self {
        SignalError::InvalidQuote {
            symbol: symbol.into(),
            reason: reason.into(),
        }
    }
}
