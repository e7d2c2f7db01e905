use chrono::Utc;
use signal_core::{
    BatchDerivation, DerivedSignal, MarketSummary, QuoteProvider, SignalError, SignalStore, SkippedQuote,
};
use signal_engine::{aggregate_market_with, SignalEngine};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Notify, Semaphore};
use tokio::task::JoinSet;

use crate::config::RefreshConfig;
use crate::events::{EventBus, SignalEvent};
use crate::sectors::default_sector_map;

const EVENT_CAPACITY: usize = 64;
const SAMPLE_SIZE: usize = 3;

/// Outcome of one refresh cycle.
#[derive(Debug, Clone)]
pub struct RefreshReport {
    pub cycle: u64,
    pub requested: usize,
    pub updated: usize,
    pub skipped: Vec<SkippedQuote>,
    pub failed_batches: usize,
    /// Summary written this cycle, or the previously stored one when the
    /// cycle had nothing to aggregate.
    pub summary: Option<MarketSummary>,
    pub summary_retained: bool,
    pub sample: Vec<DerivedSignal>,
}

pub struct RefreshWorker {
    provider: Arc<dyn QuoteProvider>,
    store: Arc<dyn SignalStore>,
    engine: SignalEngine,
    sectors: HashMap<String, String>,
    symbols: Vec<String>,
    batch_size: usize,
    concurrency: usize,
    fetch_timeout: Duration,
    interval: Duration,
    events: EventBus,
    cycle: AtomicU64,
}

impl RefreshWorker {
    pub fn new(
        provider: Arc<dyn QuoteProvider>,
        store: Arc<dyn SignalStore>,
        config: &RefreshConfig,
    ) -> (Self, broadcast::Receiver<SignalEvent>) {
        let (events, rx) = EventBus::new(EVENT_CAPACITY);
        let worker = Self {
            provider,
            store,
            engine: SignalEngine::new(),
            sectors: default_sector_map(),
            symbols: config.symbols.clone(),
            batch_size: config.batch_size.max(1),
            concurrency: config.concurrency.max(1),
            fetch_timeout: config.fetch_timeout,
            interval: config.interval,
            events,
            cycle: AtomicU64::new(0),
        };
        (worker, rx)
    }

    pub fn with_engine(mut self, engine: SignalEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_sectors(mut self, sectors: HashMap<String, String>) -> Self {
        self.sectors = sectors;
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SignalEvent> {
        self.events.subscribe()
    }

    /// Fetch, derive, persist and summarise once.
    ///
    /// A failed or timed-out batch only loses its own symbols. Storage errors
    /// fail the cycle.
    pub async fn run_cycle(&self) -> Result<RefreshReport, SignalError> {
        let cycle = self.cycle.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::info!(
            "Refresh cycle {} starting: {} symbols via {}",
            cycle,
            self.symbols.len(),
            self.provider.name()
        );

        let (batches, failed_batches) = self.fetch_and_derive().await;

        let mut signals = Vec::new();
        let mut skipped = Vec::new();
        for batch in batches {
            signals.extend(batch.signals);
            skipped.extend(batch.skipped);
        }

        if !signals.is_empty() {
            self.store.upsert_signals(&signals).await?;
        }

        let today = Utc::now().date_naive();
        let (summary, summary_retained) =
            match aggregate_market_with(self.engine.config(), &signals, &self.sectors, today) {
                Ok(summary) => {
                    self.store.upsert_market_summary(&summary).await?;
                    (Some(summary), false)
                }
                Err(SignalError::InsufficientData(reason)) => {
                    tracing::warn!("Cycle {}: {}; keeping previous market summary", cycle, reason);
                    (self.store.latest_market_summary().await?, true)
                }
                Err(e) => return Err(e),
            };

        if !signals.is_empty() {
            self.events.publish(SignalEvent::SignalsUpdated {
                cycle,
                updated: signals.len(),
                skipped: skipped.len(),
                summary: if summary_retained { None } else { summary.clone() },
                at: Utc::now(),
            });
        }

        let report = RefreshReport {
            cycle,
            requested: self.symbols.len(),
            updated: signals.len(),
            failed_batches,
            summary,
            summary_retained,
            sample: signals.iter().take(SAMPLE_SIZE).cloned().collect(),
            skipped,
        };

        tracing::info!(
            "Refresh cycle {} done: {}/{} updated, {} skipped, {} failed batches",
            report.cycle,
            report.updated,
            report.requested,
            report.skipped.len(),
            report.failed_batches
        );

        Ok(report)
    }

    /// Batches come back in request order so the persisted order is stable.
    async fn fetch_and_derive(&self) -> (Vec<BatchDerivation>, usize) {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();

        for (index, chunk) in self.symbols.chunks(self.batch_size).enumerate() {
            let batch = chunk.to_vec();
            let provider = Arc::clone(&self.provider);
            let semaphore = Arc::clone(&semaphore);
            let engine = self.engine.clone();
            let timeout = self.fetch_timeout;

            tasks.spawn(async move {
                let result = fetch_batch(provider, semaphore, &batch, timeout)
                    .await
                    .map(|quotes| engine.derive_batch(&quotes));
                (index, result)
            });
        }

        let mut derived = Vec::new();
        let mut failed = 0;

        while let Some(result) = tasks.join_next().await {
            match result {
                Ok((index, Ok(batch))) => derived.push((index, batch)),
                Ok((index, Err(e))) => {
                    tracing::warn!("Quote batch {} failed: {}", index, e);
                    failed += 1;
                }
                Err(e) => {
                    tracing::error!("Quote batch task error: {}", e);
                    failed += 1;
                }
            }
        }

        derived.sort_by_key(|(index, _)| *index);
        (derived.into_iter().map(|(_, batch)| batch).collect(), failed)
    }

    /// Run cycles every `interval` until `shutdown` is notified.
    pub async fn run(&self, shutdown: Arc<Notify>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.run_cycle().await {
                        tracing::error!("Refresh cycle failed: {}", e);
                    }
                }
                _ = shutdown.notified() => {
                    tracing::info!("Refresh worker shutdown requested");
                    return;
                }
            }
        }
    }
}

async fn fetch_batch(
    provider: Arc<dyn QuoteProvider>,
    semaphore: Arc<Semaphore>,
    symbols: &[String],
    timeout: Duration,
) -> Result<Vec<signal_core::Quote>, SignalError> {
    let _permit = semaphore
        .acquire_owned()
        .await
        .map_err(|e| SignalError::Provider(e.to_string()))?;

    match tokio::time::timeout(timeout, provider.fetch_quotes(symbols)).await {
        Ok(result) => result,
        Err(_) => Err(SignalError::Provider(format!(
            "timed out after {}s fetching {} symbols",
            timeout.as_secs(),
            symbols.len()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use quote_client::SnapshotQuoteProvider;
    use signal_core::{AiTag, Quote};
    use signal_store::MemorySignalStore;

    fn quote(symbol: &str, price: f64, previous_close: f64, volume: u64) -> Quote {
        Quote {
            symbol: symbol.to_string(),
            price,
            previous_close,
            day_high: price.max(previous_close) * 1.01,
            day_low: price.min(previous_close) * 0.99,
            volume,
            average_volume: Some(1_000_000),
            fifty_two_week_high: None,
            fifty_two_week_low: None,
        }
    }

    fn config(symbols: &[&str], batch_size: usize) -> RefreshConfig {
        RefreshConfig {
            symbols: symbols.iter().map(|s| s.to_string()).collect(),
            batch_size,
            fetch_timeout: Duration::from_millis(200),
            ..RefreshConfig::default()
        }
    }

    fn sectors() -> HashMap<String, String> {
        [("AAA", "Banking"), ("BBB", "Banking"), ("CCC", "Power"), ("DDD", "Power")]
            .iter()
            .map(|(s, sector)| (s.to_string(), sector.to_string()))
            .collect()
    }

    /// Fails any batch containing `poison`.
    struct FlakyProvider {
        inner: SnapshotQuoteProvider,
        poison: &'static str,
    }

    #[async_trait]
    impl QuoteProvider for FlakyProvider {
        async fn fetch_quotes(&self, symbols: &[String]) -> Result<Vec<Quote>, SignalError> {
            if symbols.iter().any(|s| s == self.poison) {
                return Err(SignalError::Provider("upstream 500".to_string()));
            }
            self.inner.fetch_quotes(symbols).await
        }

        fn name(&self) -> &str {
            "flaky"
        }
    }

    struct SlowProvider;

    #[async_trait]
    impl QuoteProvider for SlowProvider {
        async fn fetch_quotes(&self, _symbols: &[String]) -> Result<Vec<Quote>, SignalError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Vec::new())
        }

        fn name(&self) -> &str {
            "slow"
        }
    }

    #[tokio::test]
    async fn test_cycle_persists_signals_and_summary() {
        let provider = SnapshotQuoteProvider::new(vec![
            quote("AAA", 103.01, 100.0, 3_000_000),
            quote("BBB", 101.0, 100.0, 1_000_000),
            quote("CCC", 98.0, 100.0, 900_000),
        ]);
        let store = Arc::new(MemorySignalStore::new());
        let (worker, mut rx) = RefreshWorker::new(
            Arc::new(provider),
            store.clone(),
            &config(&["AAA", "BBB", "CCC"], 2),
        );
        let worker = worker.with_sectors(sectors());

        let report = worker.run_cycle().await.unwrap();
        assert_eq!(report.cycle, 1);
        assert_eq!(report.updated, 3);
        assert_eq!(report.failed_batches, 0);
        assert!(!report.summary_retained);
        assert_eq!(report.sample.len(), 3);
        assert_eq!(report.sample[0].symbol, "AAA");

        assert_eq!(store.signal("AAA").unwrap().ai_tag, AiTag::Hot);
        let summary = store.latest_market_summary().await.unwrap().unwrap();
        assert_eq!(summary.symbol_count, 3);
        assert_eq!(summary.bearish_sectors, vec!["Power"]);

        let SignalEvent::SignalsUpdated { cycle, updated, summary, .. } = rx.recv().await.unwrap();
        assert_eq!((cycle, updated), (1, 3));
        assert!(summary.is_some());
    }

    #[tokio::test]
    async fn test_invalid_quote_skipped_without_aborting() {
        let provider = SnapshotQuoteProvider::new(vec![
            quote("AAA", 101.0, 100.0, 1_000_000),
            quote("BBB", 0.0, 100.0, 1_000_000),
        ]);
        let store = Arc::new(MemorySignalStore::new());
        let (worker, _rx) = RefreshWorker::new(Arc::new(provider), store.clone(), &config(&["AAA", "BBB"], 10));

        let report = worker.run_cycle().await.unwrap();
        assert_eq!(report.updated, 1);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].symbol, "BBB");
        assert!(matches!(report.skipped[0].reason, SignalError::InvalidQuote { .. }));
        assert!(store.signal("BBB").is_none());
    }

    #[tokio::test]
    async fn test_failed_batch_does_not_stop_others() {
        let inner = SnapshotQuoteProvider::new(vec![
            quote("AAA", 101.0, 100.0, 1_000_000),
            quote("BBB", 99.0, 100.0, 1_000_000),
            quote("CCC", 102.0, 100.0, 1_000_000),
            quote("DDD", 98.0, 100.0, 1_000_000),
        ]);
        let provider = FlakyProvider { inner, poison: "CCC" };
        let store = Arc::new(MemorySignalStore::new());
        let (worker, _rx) = RefreshWorker::new(
            Arc::new(provider),
            store.clone(),
            &config(&["AAA", "BBB", "CCC", "DDD"], 2),
        );

        let report = worker.run_cycle().await.unwrap();
        assert_eq!(report.failed_batches, 1);
        assert_eq!(report.updated, 2);
        let stored: Vec<String> = store.signals().await.unwrap().into_iter().map(|s| s.symbol).collect();
        assert_eq!(stored, vec!["AAA", "BBB"]);
    }

    #[tokio::test]
    async fn test_empty_cycle_keeps_previous_summary() {
        let store = Arc::new(MemorySignalStore::new());
        let mut snapshot = SnapshotQuoteProvider::new(vec![quote("AAA", 101.0, 100.0, 1_000_000)]);

        let (worker, _rx) =
            RefreshWorker::new(Arc::new(snapshot.clone()), store.clone(), &config(&["AAA"], 10));
        let first = worker.run_cycle().await.unwrap();
        let previous = first.summary.unwrap();

        // Same symbol now only has a broken quote.
        snapshot.insert(quote("AAA", f64::NAN, 100.0, 1_000_000));
        let (worker, mut rx) = RefreshWorker::new(Arc::new(snapshot), store.clone(), &config(&["AAA"], 10));

        let report = worker.run_cycle().await.unwrap();
        assert_eq!(report.updated, 0);
        assert!(report.summary_retained);
        assert_eq!(report.summary, Some(previous.clone()));
        assert_eq!(store.latest_market_summary().await.unwrap(), Some(previous));
        assert_eq!(store.summary_count(), 1);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_fetch_timeout_counts_as_failed_batch() {
        let store = Arc::new(MemorySignalStore::new());
        let (worker, _rx) = RefreshWorker::new(Arc::new(SlowProvider), store.clone(), &config(&["AAA", "BBB"], 1));

        let report = worker.run_cycle().await.unwrap();
        assert_eq!(report.failed_batches, 2);
        assert_eq!(report.updated, 0);
        assert!(report.summary.is_none());
    }

    #[tokio::test]
    async fn test_same_day_rerun_overwrites_summary() {
        let store = Arc::new(MemorySignalStore::new());
        let provider = SnapshotQuoteProvider::new(vec![quote("AAA", 101.0, 100.0, 1_000_000)]);
        let (worker, _rx) = RefreshWorker::new(Arc::new(provider), store.clone(), &config(&["AAA"], 10));

        let first = worker.run_cycle().await.unwrap();
        let second = worker.run_cycle().await.unwrap();
        assert_eq!(second.cycle, first.cycle + 1);
        assert_eq!(store.summary_count(), 1);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let store = Arc::new(MemorySignalStore::new());
        let provider = SnapshotQuoteProvider::new(vec![quote("AAA", 101.0, 100.0, 1_000_000)]);
        let (worker, mut rx) = RefreshWorker::new(Arc::new(provider), store, &config(&["AAA"], 10));
        let worker = Arc::new(worker);
        let shutdown = Arc::new(Notify::new());

        let handle = {
            let worker = Arc::clone(&worker);
            let shutdown = Arc::clone(&shutdown);
            tokio::spawn(async move { worker.run(shutdown).await })
        };

        // First tick fires immediately.
        assert!(rx.recv().await.is_ok());
        shutdown.notify_one();
        tokio::time::timeout(Duration::from_secs(2), handle).await.unwrap().unwrap();
    }
}
