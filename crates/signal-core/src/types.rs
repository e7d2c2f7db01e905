use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Point-in-time price/volume snapshot for one symbol, as delivered by a quote provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub symbol: String,
    pub price: f64,
    pub previous_close: f64,
    pub day_high: f64,
    pub day_low: f64,
    pub volume: u64,
    /// Trailing reference volume. Zero or missing means "use today's volume".
    #[serde(default)]
    pub average_volume: Option<u64>,
    #[serde(default)]
    pub fifty_two_week_high: Option<f64>,
    #[serde(default)]
    pub fifty_two_week_low: Option<f64>,
}

impl Quote {
    /// Both 52-week bounds, when present, finite and forming a non-empty range.
    pub fn year_range(&self) -> Option<(f64, f64)> {
        match (self.fifty_two_week_low, self.fifty_two_week_high) {
            (Some(low), Some(high)) if low.is_finite() && high.is_finite() && high > low => {
                Some((low, high))
            }
            _ => None,
        }
    }
}

/// Classification label attached to a symbol each cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AiTag {
    Hot,
    #[serde(rename = "Strong Momentum")]
    StrongMomentum,
    Rising,
    Breakout,
    Oversold,
    Overbought,
    Watchlist,
    Neutral,
}

impl AiTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            AiTag::Hot => "Hot",
            AiTag::StrongMomentum => "Strong Momentum",
            AiTag::Rising => "Rising",
            AiTag::Breakout => "Breakout",
            AiTag::Oversold => "Oversold",
            AiTag::Overbought => "Overbought",
            AiTag::Watchlist => "Watchlist",
            AiTag::Neutral => "Neutral",
        }
    }
}

impl fmt::Display for AiTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AiTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Hot" => Ok(AiTag::Hot),
            "Strong Momentum" => Ok(AiTag::StrongMomentum),
            "Rising" => Ok(AiTag::Rising),
            "Breakout" => Ok(AiTag::Breakout),
            "Oversold" => Ok(AiTag::Oversold),
            "Overbought" => Ok(AiTag::Overbought),
            "Watchlist" => Ok(AiTag::Watchlist),
            "Neutral" => Ok(AiTag::Neutral),
            other => Err(format!("unknown ai tag: {}", other)),
        }
    }
}

/// Scores derived from a single quote. Recomputed every cycle and replaces the
/// previous record for the symbol wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedSignal {
    pub symbol: String,
    pub price: f64,
    pub volume: u64,
    /// Reference volume actually used (today's volume when the quote had none).
    pub average_volume: u64,
    pub change_percent: f64,
    pub volume_ratio: f64,
    /// 0.1 to 0.95
    pub sentiment: f64,
    /// 0.1 to 0.9
    pub volatility: f64,
    /// Momentum proxy in 10 to 90. This is NOT a Wilder RSI: there is no
    /// gain/loss averaging over a lookback window, only today's change scaled.
    pub rsi_approx: f64,
    pub ai_tag: AiTag,
    pub is_trending: bool,
}

/// A quote that could not be scored, with the reason.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedQuote {
    pub symbol: String,
    pub reason: crate::SignalError,
}

/// Result of scoring a batch of quotes: successes in input order plus skips.
#[derive(Debug, Clone, Default)]
pub struct BatchDerivation {
    pub signals: Vec<DerivedSignal>,
    pub skipped: Vec<SkippedQuote>,
}

/// Market-wide mood label derived from the fear-greed score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarketMood {
    #[serde(rename = "Extreme Greed")]
    ExtremeGreed,
    Greed,
    #[serde(rename = "Cautiously Optimistic")]
    CautiouslyOptimistic,
    Neutral,
    Cautious,
    Fear,
    #[serde(rename = "Extreme Fear")]
    ExtremeFear,
}

impl MarketMood {
    /// Breakpoints evaluated high to low, first match wins.
    pub fn from_score(score: u8) -> Self {
        match score {
            s if s >= 75 => MarketMood::ExtremeGreed,
            s if s >= 60 => MarketMood::Greed,
            s if s >= 55 => MarketMood::CautiouslyOptimistic,
            s if s >= 45 => MarketMood::Neutral,
            s if s >= 40 => MarketMood::Cautious,
            s if s >= 25 => MarketMood::Fear,
            _ => MarketMood::ExtremeFear,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MarketMood::ExtremeGreed => "Extreme Greed",
            MarketMood::Greed => "Greed",
            MarketMood::CautiouslyOptimistic => "Cautiously Optimistic",
            MarketMood::Neutral => "Neutral",
            MarketMood::Cautious => "Cautious",
            MarketMood::Fear => "Fear",
            MarketMood::ExtremeFear => "Extreme Fear",
        }
    }
}

impl fmt::Display for MarketMood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MarketMood {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Extreme Greed" => Ok(MarketMood::ExtremeGreed),
            "Greed" => Ok(MarketMood::Greed),
            "Cautiously Optimistic" => Ok(MarketMood::CautiouslyOptimistic),
            "Neutral" => Ok(MarketMood::Neutral),
            "Cautious" => Ok(MarketMood::Cautious),
            "Fear" => Ok(MarketMood::Fear),
            "Extreme Fear" => Ok(MarketMood::ExtremeFear),
            other => Err(format!("unknown market mood: {}", other)),
        }
    }
}

/// Coarse band of the approximate VIX
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VixBand {
    Low,
    Moderate,
    High,
}

impl VixBand {
    pub fn from_vix(vix: f64) -> Self {
        if vix < 15.0 {
            VixBand::Low
        } else if vix < 25.0 {
            VixBand::Moderate
        } else {
            VixBand::High
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            VixBand::Low => "Low Volatility",
            VixBand::Moderate => "Moderate",
            VixBand::High => "High Volatility",
        }
    }
}

/// One market-wide summary per calendar date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSummary {
    pub date: NaiveDate,
    /// 0 to 100
    pub fear_greed_score: u8,
    pub market_mood: MarketMood,
    pub vix_approx: f64,
    pub bullish_sectors: Vec<String>,
    pub bearish_sectors: Vec<String>,
    pub active_sectors: Vec<String>,
    /// Symbols up more than 1% on the day
    pub advancing: usize,
    /// Symbols down more than 1% on the day
    pub declining: usize,
    pub symbol_count: usize,
}

impl MarketSummary {
    pub fn vix_band(&self) -> VixBand {
        VixBand::from_vix(self.vix_approx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mood_breakpoints() {
        assert_eq!(MarketMood::from_score(100), MarketMood::ExtremeGreed);
        assert_eq!(MarketMood::from_score(75), MarketMood::ExtremeGreed);
        assert_eq!(MarketMood::from_score(74), MarketMood::Greed);
        assert_eq!(MarketMood::from_score(60), MarketMood::Greed);
        assert_eq!(MarketMood::from_score(55), MarketMood::CautiouslyOptimistic);
        assert_eq!(MarketMood::from_score(54), MarketMood::Neutral);
        assert_eq!(MarketMood::from_score(45), MarketMood::Neutral);
        assert_eq!(MarketMood::from_score(40), MarketMood::Cautious);
        assert_eq!(MarketMood::from_score(39), MarketMood::Fear);
        assert_eq!(MarketMood::from_score(25), MarketMood::Fear);
        assert_eq!(MarketMood::from_score(24), MarketMood::ExtremeFear);
        assert_eq!(MarketMood::from_score(0), MarketMood::ExtremeFear);
    }

    #[test]
    fn test_labels_parse_back() {
        for tag in [
            AiTag::Hot,
            AiTag::StrongMomentum,
            AiTag::Rising,
            AiTag::Breakout,
            AiTag::Oversold,
            AiTag::Overbought,
            AiTag::Watchlist,
            AiTag::Neutral,
        ] {
            assert_eq!(tag.as_str().parse::<AiTag>().unwrap(), tag);
        }
        assert!("Moonshot".parse::<AiTag>().is_err());
        assert_eq!(
            "Cautiously Optimistic".parse::<MarketMood>().unwrap(),
            MarketMood::CautiouslyOptimistic
        );
    }

    #[test]
    fn test_vix_band() {
        assert_eq!(VixBand::from_vix(12.0), VixBand::Low);
        assert_eq!(VixBand::from_vix(15.0), VixBand::Moderate);
        assert_eq!(VixBand::from_vix(25.0), VixBand::High);
    }

    #[test]
    fn test_quote_wire_format() {
        let json = r#"{
            "symbol": "TCS",
            "price": 3850.5,
            "previousClose": 3800.0,
            "dayHigh": 3870.0,
            "dayLow": 3790.0,
            "volume": 1200000
        }"#;
        let quote: Quote = serde_json::from_str(json).unwrap();
        assert_eq!(quote.previous_close, 3800.0);
        assert_eq!(quote.average_volume, None);
        assert_eq!(quote.year_range(), None);
    }

    #[test]
    fn test_year_range_rejects_inverted_bounds() {
        let quote = Quote {
            symbol: "X".to_string(),
            price: 10.0,
            previous_close: 10.0,
            day_high: 10.0,
            day_low: 10.0,
            volume: 0,
            average_volume: None,
            fifty_two_week_high: Some(5.0),
            fifty_two_week_low: Some(12.0),
        };
        assert_eq!(quote.year_range(), None);
    }
}
