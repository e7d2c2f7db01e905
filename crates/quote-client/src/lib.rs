//! Quote providers for the refresh worker.
//!
//! `YahooQuoteClient` talks to the public quote endpoint; `SnapshotQuoteProvider`
//! serves a fixed set of quotes (fixtures, replays, offline runs).

pub mod snapshot;
pub mod yahoo;

pub use snapshot::SnapshotQuoteProvider;
pub use yahoo::{YahooQuote, YahooQuoteClient, DEFAULT_SYMBOL_SUFFIX};
