//! Numeric helpers shared by the scoring stages.
//!
//! Every score the engine emits passes through [`bounded`], so an extreme or
//! degenerate input can never leak NaN or infinity into a derived record.

/// Arithmetic mean of a slice (0.0 for an empty slice).
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Clamp `value` into `[min, max]`.
///
/// NaN maps to `min`, +inf to `max`, -inf to `min`.
pub fn bounded(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() {
        return min;
    }
    value.clamp(min, max)
}

/// Ratio with a guarded denominator: a zero denominator yields `fallback`.
pub fn safe_ratio(numerator: f64, denominator: f64, fallback: f64) -> f64 {
    if denominator <= 0.0 || !denominator.is_finite() {
        return fallback;
    }
    let ratio = numerator / denominator;
    if ratio.is_finite() {
        ratio
    } else {
        fallback
    }
}

/// Percent change from `previous` to `current`.
///
/// An overflowing move saturates in its own direction. A non-positive or
/// non-finite `previous` (or a NaN `current`) yields 0.0.
pub fn percent_change(current: f64, previous: f64) -> f64 {
    if previous <= 0.0 || !previous.is_finite() || current.is_nan() {
        return 0.0;
    }
    bounded((current - previous) / previous * 100.0, f64::MIN, f64::MAX)
}
