//! Market-wide reduction over one cycle's derived signals.

use chrono::NaiveDate;
use signal_core::stats::{bounded, mean};
use signal_core::{DerivedSignal, MarketMood, MarketSummary, SectorLookup, SignalError};
use std::collections::BTreeMap;

use crate::config::ScoringConfig;

/// Mean day change of one sector
#[derive(Debug, Clone, PartialEq)]
pub struct SectorMove {
    pub sector: String,
    pub mean_change: f64,
    pub members: usize,
}

/// Summarise a cycle with the canonical thresholds.
pub fn aggregate_market(
    signals: &[DerivedSignal],
    sectors: &dyn SectorLookup,
    date: NaiveDate,
) -> Result<MarketSummary, SignalError> {
    aggregate_market_with(&ScoringConfig::default(), signals, sectors, date)
}

/// Summarise a cycle. Fails with `InsufficientData` when there is nothing to
/// summarise; callers should then keep the previous summary.
pub fn aggregate_market_with(
    config: &ScoringConfig,
    signals: &[DerivedSignal],
    sectors: &dyn SectorLookup,
    date: NaiveDate,
) -> Result<MarketSummary, SignalError> {
    if signals.is_empty() {
        return Err(SignalError::InsufficientData(
            "no derived signals to aggregate".to_string(),
        ));
    }

    let sentiments: Vec<f64> = signals.iter().map(|s| s.sentiment).collect();
    let volatilities: Vec<f64> = signals.iter().map(|s| s.volatility).collect();
    let mean_sentiment = mean(&sentiments);
    let mean_volatility = mean(&volatilities);

    let fear_greed_score = bounded((mean_sentiment * 100.0).round(), 0.0, 100.0) as u8;
    let market_mood = MarketMood::from_score(fear_greed_score);
    let vix_approx = config.vix_base + mean_volatility * config.vix_multiplier;

    let ranked = rank_sectors(signals, sectors);
    let threshold = config.sector_change_threshold;

    let bullish_sectors: Vec<String> = ranked
        .iter()
        .filter(|m| m.mean_change > threshold)
        .take(config.bullish_sector_count)
        .map(|m| m.sector.clone())
        .collect();

    let bearish_sectors: Vec<String> = ranked
        .iter()
        .rev()
        .filter(|m| m.mean_change < -threshold)
        .take(config.bearish_sector_count)
        .map(|m| m.sector.clone())
        .collect();

    let mut active_sectors: Vec<String> = ranked
        .iter()
        .take(config.active_sector_count)
        .map(|m| m.sector.clone())
        .collect();
    for fallback in &config.fallback_active_sectors {
        if active_sectors.len() >= config.active_sector_count {
            break;
        }
        if !active_sectors.contains(fallback) {
            active_sectors.push(fallback.clone());
        }
    }

    let advancing = signals
        .iter()
        .filter(|s| s.change_percent > config.breadth_change)
        .count();
    let declining = signals
        .iter()
        .filter(|s| s.change_percent < -config.breadth_change)
        .count();

    tracing::debug!(
        "Aggregated {} signals: score={} mood={} vix={:.2}",
        signals.len(),
        fear_greed_score,
        market_mood,
        vix_approx
    );

    Ok(MarketSummary {
        date,
        fear_greed_score,
        market_mood,
        vix_approx,
        bullish_sectors,
        bearish_sectors,
        active_sectors,
        advancing,
        declining,
        symbol_count: signals.len(),
    })
}

/// Group signals by sector and rank by mean change, strongest first.
/// Symbols without a known sector are left out. Ties are broken by name.
pub fn rank_sectors(signals: &[DerivedSignal], sectors: &dyn SectorLookup) -> Vec<SectorMove> {
    let mut groups: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for signal in signals {
        if let Some(sector) = sectors.sector_of(&signal.symbol) {
            groups.entry(sector).or_default().push(signal.change_percent);
        }
    }

    let mut ranked: Vec<SectorMove> = groups
        .into_iter()
        .map(|(sector, changes)| SectorMove {
            sector: sector.to_string(),
            mean_change: mean(&changes),
            members: changes.len(),
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.mean_change
            .partial_cmp(&a.mean_change)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.sector.cmp(&b.sector))
    });
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use signal_core::AiTag;
    use std::collections::HashMap;

    fn signal(symbol: &str, change_percent: f64, sentiment: f64, volatility: f64) -> DerivedSignal {
        DerivedSignal {
            symbol: symbol.to_string(),
            price: 100.0,
            volume: 1_000,
            average_volume: 1_000,
            change_percent,
            volume_ratio: 1.0,
            sentiment,
            volatility,
            rsi_approx: 50.0,
            ai_tag: AiTag::Neutral,
            is_trending: false,
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    fn three_sectors() -> (Vec<DerivedSignal>, HashMap<&'static str, &'static str>) {
        let signals = vec![
            signal("A1", 3.0, 0.5, 0.2),
            signal("A2", 1.0, 0.5, 0.2),
            signal("B1", -1.0, 0.5, 0.2),
            signal("C1", 0.3, 0.5, 0.2),
        ];
        let sectors = HashMap::from([("A1", "A"), ("A2", "A"), ("B1", "B"), ("C1", "C")]);
        (signals, sectors)
    }

    #[test]
    fn test_empty_input_is_insufficient_data() {
        let sectors: HashMap<String, String> = HashMap::new();
        let err = aggregate_market(&[], &sectors, date()).unwrap_err();
        assert!(matches!(err, SignalError::InsufficientData(_)));
    }

    #[test]
    fn test_fear_greed_from_mean_sentiment() {
        let sectors: HashMap<String, String> = HashMap::new();
        let signals = vec![signal("X", 0.0, 0.75, 0.2), signal("Y", 0.0, 0.85, 0.2)];
        let summary = aggregate_market(&signals, &sectors, date()).unwrap();
        assert_eq!(summary.fear_greed_score, 80);
        // 80 sits above the 75 breakpoint.
        assert_eq!(summary.market_mood, MarketMood::ExtremeGreed);

        let signals = vec![signal("X", 0.0, 0.7, 0.2)];
        let summary = aggregate_market(&signals, &sectors, date()).unwrap();
        assert_eq!(summary.fear_greed_score, 70);
        assert_eq!(summary.market_mood, MarketMood::Greed);

        let signals = vec![signal("X", 0.0, 0.1, 0.2)];
        let summary = aggregate_market(&signals, &sectors, date()).unwrap();
        assert_eq!(summary.fear_greed_score, 10);
        assert_eq!(summary.market_mood, MarketMood::ExtremeFear);
    }

    #[test]
    fn test_vix_approx() {
        let sectors: HashMap<String, String> = HashMap::new();
        let signals = vec![signal("X", 0.0, 0.5, 0.2), signal("Y", 0.0, 0.5, 0.4)];
        let summary = aggregate_market(&signals, &sectors, date()).unwrap();
        assert!((summary.vix_approx - 19.0).abs() < 1e-9);
        assert_eq!(summary.vix_band(), signal_core::VixBand::Moderate);
    }

    #[test]
    fn test_sector_ranking() {
        let (signals, sectors) = three_sectors();
        let ranked = rank_sectors(&signals, &sectors);
        let names: Vec<&str> = ranked.iter().map(|m| m.sector.as_str()).collect();
        assert_eq!(names, vec!["A", "C", "B"]);
        assert!((ranked[0].mean_change - 2.0).abs() < 1e-9);
        assert_eq!(ranked[0].members, 2);

        let summary = aggregate_market(&signals, &sectors, date()).unwrap();
        // C averages +0.3, inside the +/-0.5 dead zone.
        assert_eq!(summary.bullish_sectors, vec!["A".to_string()]);
        assert_eq!(summary.bearish_sectors, vec!["B".to_string()]);
    }

    #[test]
    fn test_sector_threshold_is_configurable() {
        let (signals, sectors) = three_sectors();
        let config = ScoringConfig {
            sector_change_threshold: 0.25,
            ..ScoringConfig::default()
        };
        let summary = aggregate_market_with(&config, &signals, &sectors, date()).unwrap();
        assert_eq!(summary.bullish_sectors, vec!["A".to_string(), "C".to_string()]);
        assert_eq!(summary.bearish_sectors, vec!["B".to_string()]);
    }

    #[test]
    fn test_sector_list_lengths() {
        let changes = [("S1", 5.0), ("S2", 4.0), ("S3", 3.0), ("S4", 2.0), ("S5", -1.0), ("S6", -2.0), ("S7", -3.0)];
        let signals: Vec<DerivedSignal> = changes
            .iter()
            .map(|(name, change)| signal(name, *change, 0.5, 0.2))
            .collect();
        let sectors: HashMap<&str, &str> = changes.iter().map(|(name, _)| (*name, *name)).collect();

        let summary = aggregate_market(&signals, &sectors, date()).unwrap();
        assert_eq!(summary.bullish_sectors, vec!["S1", "S2", "S3"]);
        // Weakest first
        assert_eq!(summary.bearish_sectors, vec!["S7", "S6"]);
        assert_eq!(summary.active_sectors, vec!["S1", "S2", "S3", "S4"]);
    }

    #[test]
    fn test_active_sectors_fall_back_when_few_sectors() {
        let (signals, sectors) = three_sectors();
        let summary = aggregate_market(&signals, &sectors, date()).unwrap();
        assert_eq!(summary.active_sectors, vec!["A", "C", "B", "Banking"]);

        let no_sectors: HashMap<String, String> = HashMap::new();
        let summary = aggregate_market(&signals, &no_sectors, date()).unwrap();
        assert_eq!(
            summary.active_sectors,
            vec!["Banking", "Information Technology", "Oil & Gas", "Pharmaceuticals"]
        );
        assert!(summary.bullish_sectors.is_empty());
    }

    #[test]
    fn test_breadth_counts() {
        let (signals, sectors) = three_sectors();
        let summary = aggregate_market(&signals, &sectors, date()).unwrap();
        assert_eq!(summary.advancing, 1);
        assert_eq!(summary.declining, 0);
        assert_eq!(summary.symbol_count, 4);
        assert_eq!(summary.date, date());
    }
}
