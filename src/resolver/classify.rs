use crate::error::ReferenceError;
use crate::models::{validate_value, RangeStatus, ReferenceRange};

/// Three-way verdict for `value` against `range`, inclusive at both bounds.
///
/// A missing range yields `Unknown`. Ranges without a floor never yield `Low`.
pub fn classify(value: f64, range: Option<&ReferenceRange>) -> Result<RangeStatus, ReferenceError> {
    validate_value("value", value)?;
    let Some(range) = range else {
        return Ok(RangeStatus::Unknown);
    };

    if let Some(min) = range.min_value {
        if value < min {
            return Ok(RangeStatus::Low);
        }
    }
    if value > range.max_value {
        return Ok(RangeStatus::High);
    }
    Ok(RangeStatus::Normal)
}
