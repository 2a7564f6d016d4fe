use crate::config::TREND_FLAT_THRESHOLD_PERCENT;
use crate::error::ReferenceError;
use crate::models::{validate_value, TrendDirection, TrendResult};

/// Trend of `current` relative to `previous` using the default 5 % flat band.
pub fn compute_trend(current: f64, previous: Option<f64>) -> Result<TrendResult, ReferenceError> {
    compute_trend_with_threshold(current, previous, TREND_FLAT_THRESHOLD_PERCENT)
}

/// Trend with an explicit flat band: `|percent| < threshold` is `Flat`,
/// anything at or beyond the threshold is `Up` or `Down`.
///
/// No previous value, or a previous value of zero, yields `Unknown`.
pub fn compute_trend_with_threshold(
    current: f64,
    previous: Option<f64>,
    flat_threshold_percent: f64,
) -> Result<TrendResult, ReferenceError> {
    validate_value("current", current)?;
    let Some(previous) = previous else {
        return Ok(TrendResult::unknown());
    };
    validate_value("previous", previous)?;
    if previous == 0.0 {
        return Ok(TrendResult::unknown());
    }

    let percent_change = round_percent((current - previous) * 100.0 / previous);
    let direction = if percent_change.abs() < flat_threshold_percent {
        TrendDirection::Flat
    } else if percent_change > 0.0 {
        TrendDirection::Up
    } else {
        TrendDirection::Down
    };

    Ok(TrendResult {
        direction,
        percent_change: Some(percent_change),
    })
}

/// Round to nine decimal places so decimal inputs sitting on the threshold
/// (0.21 vs 0.2) classify the same way as whole-number ones (21 vs 20).
fn round_percent(percent: f64) -> f64 {
    const SCALE: f64 = 1e9;
    let scaled = percent * SCALE;
    if scaled.is_finite() {
        scaled.round() / SCALE
    } else {
        percent
    }
}
