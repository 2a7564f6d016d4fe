use serde::{Deserialize, Serialize};

use super::enums::{RangeStatus, TrendDirection};
use super::reference_range::ReferenceRange;

/// Outcome of resolving one observation against the reference data.
///
/// `matched_range` is `None` exactly when `status` is `Unknown`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub status: RangeStatus,
    pub matched_range: Option<ReferenceRange>,
}

impl ClassificationResult {
    pub fn unknown() -> Self {
        Self {
            status: RangeStatus::Unknown,
            matched_range: None,
        }
    }
}

/// Change of a value relative to the preceding observation of the same test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendResult {
    pub direction: TrendDirection,
    /// Signed percent change; `None` when `direction` is `Unknown`.
    pub percent_change: Option<f64>,
}

impl TrendResult {
    pub fn unknown() -> Self {
        Self {
            direction: TrendDirection::Unknown,
            percent_change: None,
        }
    }
}
