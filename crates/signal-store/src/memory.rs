use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::DashMap;
use signal_core::{DerivedSignal, MarketSummary, SignalError, SignalStore};
use std::sync::Arc;

/// In-process store, used when no database is configured and in tests.
#[derive(Clone, Default)]
pub struct MemorySignalStore {
    signals: Arc<DashMap<String, DerivedSignal>>,
    summaries: Arc<DashMap<NaiveDate, MarketSummary>>,
}

impl MemorySignalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signal(&self, symbol: &str) -> Option<DerivedSignal> {
        self.signals.get(symbol).map(|entry| entry.value().clone())
    }

    pub fn summary_count(&self) -> usize {
        self.summaries.len()
    }
}

#[async_trait]
impl SignalStore for MemorySignalStore {
    async fn upsert_signals(&self, signals: &[DerivedSignal]) -> Result<(), SignalError> {
        for signal in signals {
            self.signals.insert(signal.symbol.clone(), signal.clone());
        }
        Ok(())
    }

    async fn upsert_market_summary(&self, summary: &MarketSummary) -> Result<(), SignalError> {
        self.summaries.insert(summary.date, summary.clone());
        Ok(())
    }

    async fn latest_market_summary(&self) -> Result<Option<MarketSummary>, SignalError> {
        Ok(self
            .summaries
            .iter()
            .max_by_key(|entry| *entry.key())
            .map(|entry| entry.value().clone()))
    }

    async fn signals(&self) -> Result<Vec<DerivedSignal>, SignalError> {
        let mut all: Vec<DerivedSignal> = self.signals.iter().map(|e| e.value().clone()).collect();
        all.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use signal_core::{AiTag, MarketMood};

    fn signal(symbol: &str, price: f64) -> DerivedSignal {
        DerivedSignal {
            symbol: symbol.to_string(),
            price,
            volume: 1_000,
            average_volume: 1_000,
            change_percent: 0.0,
            volume_ratio: 1.0,
            sentiment: 0.5,
            volatility: 0.2,
            rsi_approx: 50.0,
            ai_tag: AiTag::Neutral,
            is_trending: false,
        }
    }

    fn summary(date: NaiveDate, score: u8) -> MarketSummary {
        MarketSummary {
            date,
            fear_greed_score: score,
            market_mood: MarketMood::from_score(score),
            vix_approx: 16.0,
            bullish_sectors: vec!["Banking".to_string()],
            bearish_sectors: vec![],
            active_sectors: vec!["Banking".to_string()],
            advancing: 1,
            declining: 0,
            symbol_count: 1,
        }
    }

    #[tokio::test]
    async fn test_upsert_replaces_by_symbol() {
        let store = MemorySignalStore::new();
        store.upsert_signals(&[signal("TCS", 100.0), signal("INFY", 50.0)]).await.unwrap();
        store.upsert_signals(&[signal("TCS", 110.0)]).await.unwrap();

        let all = store.signals().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].symbol, "INFY");
        assert_eq!(store.signal("TCS").unwrap().price, 110.0);
    }

    #[tokio::test]
    async fn test_summary_keyed_by_date() {
        let store = MemorySignalStore::new();
        let day1 = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let day2 = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();

        assert!(store.latest_market_summary().await.unwrap().is_none());

        store.upsert_market_summary(&summary(day2, 40)).await.unwrap();
        store.upsert_market_summary(&summary(day1, 70)).await.unwrap();
        store.upsert_market_summary(&summary(day2, 65)).await.unwrap();

        assert_eq!(store.summary_count(), 2);
        let latest = store.latest_market_summary().await.unwrap().unwrap();
        assert_eq!(latest.date, day2);
        assert_eq!(latest.fear_greed_score, 65);
    }
}
