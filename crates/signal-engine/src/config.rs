//! Scoring thresholds and weights.
//!
//! `ScoringConfig::default()` is the one canonical table used everywhere.

use serde::{Deserialize, Serialize};

/// One step of a signed momentum table: a move beyond `above` percent (or
/// below `-above`) moves sentiment by `weight`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MomentumStep {
    pub above: f64,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    // Sentiment
    pub sentiment_baseline: f64,
    /// Evaluated in order, first match wins. Mirrored for negative moves.
    pub momentum_steps: Vec<MomentumStep>,
    pub surge_high_ratio: f64,
    pub surge_high_weight: f64,
    pub surge_low_ratio: f64,
    pub surge_low_weight: f64,
    pub thin_volume_ratio: f64,
    pub thin_volume_penalty: f64,
    pub range_position_weight: f64,
    pub sentiment_min: f64,
    pub sentiment_max: f64,

    // Volatility
    pub day_range_weight: f64,
    pub year_range_weight: f64,
    pub blended_range_scale: f64,
    pub day_only_scale: f64,
    pub volatility_min: f64,
    pub volatility_max: f64,

    // Momentum proxy
    pub rsi_multiplier: f64,
    pub rsi_min: f64,
    pub rsi_max: f64,

    // Tags
    pub hot_volume_ratio: f64,
    pub hot_change: f64,
    pub strong_momentum_change: f64,
    pub strong_momentum_sentiment: f64,
    pub rising_change: f64,
    pub rising_sentiment: f64,
    pub breakout_volume_ratio: f64,
    pub breakout_change: f64,
    pub oversold_rsi: f64,
    pub overbought_rsi: f64,
    pub watchlist_volume_ratio: f64,

    // Trending
    pub trending_change: f64,
    pub trending_volume_ratio: f64,
    pub trending_sentiment: f64,

    // Aggregation
    pub vix_base: f64,
    pub vix_multiplier: f64,
    /// Sectors must average beyond +/- this change to count as bullish/bearish.
    pub sector_change_threshold: f64,
    pub bullish_sector_count: usize,
    pub bearish_sector_count: usize,
    pub active_sector_count: usize,
    pub fallback_active_sectors: Vec<String>,
    pub breadth_change: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            sentiment_baseline: 0.5,
            momentum_steps: vec![
                MomentumStep { above: 3.0, weight: 0.15 },
                MomentumStep { above: 1.0, weight: 0.08 },
                MomentumStep { above: 0.0, weight: 0.03 },
            ],
            surge_high_ratio: 2.0,
            surge_high_weight: 0.10,
            surge_low_ratio: 1.5,
            surge_low_weight: 0.05,
            thin_volume_ratio: 0.5,
            thin_volume_penalty: 0.05,
            range_position_weight: 0.2,
            sentiment_min: 0.1,
            sentiment_max: 0.95,

            day_range_weight: 0.4,
            year_range_weight: 0.6,
            blended_range_scale: 2.0,
            day_only_scale: 5.0,
            volatility_min: 0.1,
            volatility_max: 0.9,

            rsi_multiplier: 3.0,
            rsi_min: 10.0,
            rsi_max: 90.0,

            hot_volume_ratio: 2.0,
            hot_change: 3.0,
            strong_momentum_change: 2.0,
            strong_momentum_sentiment: 0.7,
            rising_change: 0.5,
            rising_sentiment: 0.55,
            breakout_volume_ratio: 1.8,
            breakout_change: 1.0,
            oversold_rsi: 30.0,
            overbought_rsi: 70.0,
            watchlist_volume_ratio: 1.3,

            trending_change: 2.5,
            trending_volume_ratio: 1.5,
            trending_sentiment: 0.75,

            vix_base: 10.0,
            vix_multiplier: 30.0,
            sector_change_threshold: 0.5,
            bullish_sector_count: 3,
            bearish_sector_count: 2,
            active_sector_count: 4,
            fallback_active_sectors: vec![
                "Banking".to_string(),
                "Information Technology".to_string(),
                "Oil & Gas".to_string(),
                "Pharmaceuticals".to_string(),
            ],
            breadth_change: 1.0,
        }
    }
}
