//! Periodic refresh harness: fetch quotes, derive signals, persist them and
//! the daily market summary, then announce the cycle on the event bus.

pub mod config;
pub mod events;
pub mod sectors;
pub mod worker;

pub use config::RefreshConfig;
pub use events::{EventBus, SignalEvent};
pub use sectors::{default_sector_map, default_symbols, DEFAULT_UNIVERSE};
pub use worker::{RefreshReport, RefreshWorker};
