use chrono::{DateTime, Utc};
use serde::Serialize;
use signal_core::MarketSummary;
use tokio::sync::broadcast;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SignalEvent {
    /// A cycle wrote at least one signal.
    SignalsUpdated {
        cycle: u64,
        updated: usize,
        skipped: usize,
        summary: Option<MarketSummary>,
        at: DateTime<Utc>,
    },
}

/// Fan-out of refresh events to any number of listeners.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SignalEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> (Self, broadcast::Receiver<SignalEvent>) {
        let (tx, rx) = broadcast::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SignalEvent> {
        self.tx.subscribe()
    }

    /// Returns how many listeners received the event. Zero listeners is fine.
    pub fn publish(&self, event: SignalEvent) -> usize {
        match self.tx.send(event) {
            Ok(receivers) => receivers,
            Err(_) => {
                tracing::debug!("No subscribers for signal event");
                0
            }
        }
    }
}
