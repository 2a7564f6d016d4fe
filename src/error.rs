use thiserror::Error;

/// Errors raised by reference-range ingestion and evaluation.
///
/// A missing reference range or an undefined trend is not an error: those
/// surface as `None` / `RangeStatus::Unknown` / `TrendDirection::Unknown`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReferenceError {
    #[error("Invalid input for {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Invalid reference range record #{index}: {reason}")]
    InvalidRange { index: usize, reason: String },

    #[error("Reference data load failed ({0}): {1}")]
    DataLoad(String, String),

    #[error("Reference data parse failed ({0}): {1}")]
    DataParse(String, String),
}

impl ReferenceError {
    pub(crate) fn invalid_input(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_range(index: usize, reason: impl Into<String>) -> Self {
        Self::InvalidRange {
            index,
            reason: reason.into(),
        }
    }

    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput { .. })
    }
}
