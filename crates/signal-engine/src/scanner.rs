//! Screening views over a cycle's derived signals.

use serde::{Deserialize, Serialize};
use signal_core::DerivedSignal;
use std::cmp::Ordering;

pub const DEFAULT_SCAN_LIMIT: usize = 20;
pub const DEFAULT_TRENDING_LIMIT: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScannerFilter {
    /// Momentum proxy 60-75, heaviest volume first
    Breakout,
    /// Momentum proxy at or below 30, weakest first
    Oversold,
    /// Momentum proxy at or above 70, strongest first
    Overbought,
    /// Every symbol, heaviest volume first
    VolumeSurge,
    /// Sentiment at or above 0.7, strongest first
    StrongMomentum,
}

impl ScannerFilter {
    pub fn all() -> [ScannerFilter; 5] {
        [
            ScannerFilter::Breakout,
            ScannerFilter::Oversold,
            ScannerFilter::Overbought,
            ScannerFilter::VolumeSurge,
            ScannerFilter::StrongMomentum,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            ScannerFilter::Breakout => "Breakout",
            ScannerFilter::Oversold => "Oversold",
            ScannerFilter::Overbought => "Overbought",
            ScannerFilter::VolumeSurge => "Volume Surge",
            ScannerFilter::StrongMomentum => "Strong Momentum",
        }
    }

    fn matches(&self, signal: &DerivedSignal) -> bool {
        match self {
            ScannerFilter::Breakout => (60.0..=75.0).contains(&signal.rsi_approx),
            ScannerFilter::Oversold => signal.rsi_approx <= 30.0,
            ScannerFilter::Overbought => signal.rsi_approx >= 70.0,
            ScannerFilter::VolumeSurge => true,
            ScannerFilter::StrongMomentum => signal.sentiment >= 0.7,
        }
    }

    fn order(&self, a: &DerivedSignal, b: &DerivedSignal) -> Ordering {
        match self {
            ScannerFilter::Breakout | ScannerFilter::VolumeSurge => b.volume.cmp(&a.volume),
            ScannerFilter::Oversold => cmp_f64(a.rsi_approx, b.rsi_approx),
            ScannerFilter::Overbought => cmp_f64(b.rsi_approx, a.rsi_approx),
            ScannerFilter::StrongMomentum => cmp_f64(b.sentiment, a.sentiment),
        }
    }
}

fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

/// Apply a scanner filter and return at most `limit` matches in filter order.
pub fn scan(signals: &[DerivedSignal], filter: ScannerFilter, limit: usize) -> Vec<DerivedSignal> {
    let mut hits: Vec<DerivedSignal> = signals
        .iter()
        .filter(|s| filter.matches(s))
        .cloned()
        .collect();
    hits.sort_by(|a, b| filter.order(a, b).then_with(|| a.symbol.cmp(&b.symbol)));
    hits.truncate(limit);
    hits
}

/// Trending symbols, biggest gainers first.
pub fn trending(signals: &[DerivedSignal], limit: usize) -> Vec<DerivedSignal> {
    let mut hits: Vec<DerivedSignal> = signals.iter().filter(|s| s.is_trending).cloned().collect();
    hits.sort_by(|a, b| cmp_f64(b.change_percent, a.change_percent).then_with(|| a.symbol.cmp(&b.symbol)));
    hits.truncate(limit);
    hits
}
