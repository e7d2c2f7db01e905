//! Per-symbol scoring: one quote in, one `DerivedSignal` out.

use signal_core::stats::{bounded, percent_change, safe_ratio};
use signal_core::{AiTag, BatchDerivation, DerivedSignal, Quote, SignalError, SkippedQuote};

use crate::config::ScoringConfig;

/// Stateless scorer. Cheap to clone and safe to share across threads.
#[derive(Debug, Clone, Default)]
pub struct SignalEngine {
    config: ScoringConfig,
}

impl SignalEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Score a single quote.
    ///
    /// Fails only with `InvalidQuote` when price or previous close is not a
    /// positive finite number. Everything else (zero volume, missing average
    /// volume, inverted day range, absent 52-week bounds) is absorbed.
    pub fn derive_signal(&self, quote: &Quote) -> Result<DerivedSignal, SignalError> {
        validate(quote)?;

        let change_percent = percent_change(quote.price, quote.previous_close);
        let average_volume = match quote.average_volume {
            Some(avg) if avg > 0 => avg,
            _ => quote.volume,
        };
        let volume_ratio = safe_ratio(quote.volume as f64, average_volume as f64, 1.0);

        let sentiment = self.sentiment(quote, change_percent, volume_ratio);
        let volatility = self.volatility(quote);
        let rsi_approx = self.rsi_approx(change_percent);
        let ai_tag = self.classify(change_percent, volume_ratio, sentiment, rsi_approx);
        let is_trending = self.is_trending(change_percent, volume_ratio, sentiment);

        Ok(DerivedSignal {
            symbol: quote.symbol.clone(),
            price: quote.price,
            volume: quote.volume,
            average_volume,
            change_percent,
            volume_ratio,
            sentiment,
            volatility,
            rsi_approx,
            ai_tag,
            is_trending,
        })
    }

    /// Score every quote; invalid ones are collected as skips instead of
    /// aborting the batch.
    pub fn derive_batch(&self, quotes: &[Quote]) -> BatchDerivation {
        let mut batch = BatchDerivation::default();

        for quote in quotes {
            match self.derive_signal(quote) {
                Ok(signal) => batch.signals.push(signal),
                Err(reason) => {
                    tracing::warn!("Skipping {}: {}", quote.symbol, reason);
                    batch.skipped.push(SkippedQuote {
                        symbol: quote.symbol.clone(),
                        reason,
                    });
                }
            }
        }

        batch
    }

    fn sentiment(&self, quote: &Quote, change_percent: f64, volume_ratio: f64) -> f64 {
        let cfg = &self.config;
        let mut score = cfg.sentiment_baseline;

        score += self.momentum_adjustment(change_percent);

        // Volume only amplifies the direction of the move.
        let direction = if change_percent > 0.0 {
            1.0
        } else if change_percent < 0.0 {
            -1.0
        } else {
            0.0
        };
        if volume_ratio > cfg.surge_high_ratio {
            score += direction * cfg.surge_high_weight;
        } else if volume_ratio > cfg.surge_low_ratio {
            score += direction * cfg.surge_low_weight;
        } else if volume_ratio < cfg.thin_volume_ratio {
            score -= cfg.thin_volume_penalty;
        }

        if let Some((low, high)) = quote.year_range() {
            // Not clamped: a price outside a stale 52-week range still counts fully.
            let position = (quote.price - low) / (high - low);
            score += (position - 0.5) * cfg.range_position_weight;
        }

        bounded(score, cfg.sentiment_min, cfg.sentiment_max)
    }

    fn momentum_adjustment(&self, change_percent: f64) -> f64 {
        for step in &self.config.momentum_steps {
            if change_percent > step.above {
                return step.weight;
            }
            if change_percent < -step.above {
                return -step.weight;
            }
        }
        0.0
    }

    fn volatility(&self, quote: &Quote) -> f64 {
        let cfg = &self.config;
        let day_range = if quote.day_high.is_finite() && quote.day_low.is_finite() {
            (quote.day_high - quote.day_low).max(0.0)
        } else {
            0.0
        };
        let day_volatility = day_range / quote.price;

        let raw = match quote.year_range() {
            Some((low, high)) => {
                let year_volatility = (high - low) / quote.price;
                (day_volatility * cfg.day_range_weight + year_volatility * cfg.year_range_weight)
                    * cfg.blended_range_scale
            }
            None => day_volatility * cfg.day_only_scale,
        };

        bounded(raw, cfg.volatility_min, cfg.volatility_max)
    }

    fn rsi_approx(&self, change_percent: f64) -> f64 {
        let cfg = &self.config;
        bounded(50.0 + change_percent * cfg.rsi_multiplier, cfg.rsi_min, cfg.rsi_max)
    }

    /// Ordered decision list, first match wins. All comparisons are strict.
    fn classify(&self, change: f64, volume_ratio: f64, sentiment: f64, rsi: f64) -> AiTag {
        let cfg = &self.config;

        if volume_ratio > cfg.hot_volume_ratio && change > cfg.hot_change {
            AiTag::Hot
        } else if change > cfg.strong_momentum_change && sentiment > cfg.strong_momentum_sentiment {
            AiTag::StrongMomentum
        } else if change > cfg.rising_change && sentiment > cfg.rising_sentiment {
            AiTag::Rising
        } else if volume_ratio > cfg.breakout_volume_ratio && change.abs() > cfg.breakout_change {
            AiTag::Breakout
        } else if rsi < cfg.oversold_rsi {
            AiTag::Oversold
        } else if rsi > cfg.overbought_rsi {
            AiTag::Overbought
        } else if volume_ratio > cfg.watchlist_volume_ratio {
            AiTag::Watchlist
        } else {
            AiTag::Neutral
        }
    }

    fn is_trending(&self, change: f64, volume_ratio: f64, sentiment: f64) -> bool {
        let cfg = &self.config;
        change.abs() > cfg.trending_change
            || volume_ratio > cfg.trending_volume_ratio
            || sentiment > cfg.trending_sentiment
    }
}

fn validate(quote: &Quote) -> Result<(), SignalError> {
    if !quote.price.is_finite() || quote.price <= 0.0 {
        return Err(SignalError::invalid_quote(
            &quote.symbol,
            format!("price must be positive, got {}", quote.price),
        ));
    }
    if !quote.previous_close.is_finite() || quote.previous_close <= 0.0 {
        return Err(SignalError::invalid_quote(
            &quote.symbol,
            format!("previous close must be positive, got {}", quote.previous_close),
        ));
    }
    Ok(())
}

/// Score a quote with the canonical thresholds.
pub fn derive_signal(quote: &Quote) -> Result<DerivedSignal, SignalError> {
    SignalEngine::new().derive_signal(quote)
}
