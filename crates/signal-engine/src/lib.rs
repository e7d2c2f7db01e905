//! Signal Engine
//!
//! Deterministic heuristic scoring of stock quotes. `derive` turns one quote
//! into sentiment, volatility, a momentum proxy ("RSI approximation"), a
//! classification tag and a trending flag; `aggregate` folds a cycle's signals
//! into the market-wide fear-greed summary; `scanner` provides the screening
//! views the dashboard reads.
//!
//! Everything here is pure and synchronous. Fetching quotes and persisting the
//! results belongs to the caller.

pub mod aggregate;
pub mod config;
pub mod derive;
pub mod scanner;

pub use aggregate::{aggregate_market, aggregate_market_with, rank_sectors, SectorMove};
pub use config::{MomentumStep, ScoringConfig};
pub use derive::{derive_signal, SignalEngine};
pub use scanner::{scan, trending, ScannerFilter, DEFAULT_SCAN_LIMIT, DEFAULT_TRENDING_LIMIT};
