use serde::{Deserialize, Serialize};

use super::enums::{AgeUnit, MeasurementUnit, TestType};
use crate::error::ReferenceError;

/// A reference range as it arrives from a data source, before unit normalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RangeRecord {
    pub guideline: String,
    pub test_type: TestType,
    pub age_lower: u32,
    pub age_upper: u32,
    pub age_unit: AgeUnit,
    #[serde(default)]
    pub min_value: Option<f64>,
    pub max_value: f64,
    #[serde(default)]
    pub unit: Option<MeasurementUnit>,
    #[serde(default)]
    pub citation: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Acceptable bounds for one (test type, age band, guideline) triple.
///
/// Ages are inclusive and always in months; values are inclusive and always
/// in `test_type.canonical_unit()`. A `None` floor means the test only has an
/// upper limit (IgE-style).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceRange {
    pub guideline: String,
    pub test_type: TestType,
    pub age_lower_months: u32,
    pub age_upper_months: u32,
    pub min_value: Option<f64>,
    pub max_value: f64,
    pub unit: MeasurementUnit,
    pub citation: Option<String>,
    pub notes: Option<String>,
}

impl ReferenceRange {
    /// Normalize and validate a raw record. `index` is the record's position
    /// in its source and is only used for error reporting.
    pub fn from_record(index: usize, record: RangeRecord) -> Result<Self, ReferenceError> {
        let guideline = record.guideline.trim();
        if guideline.is_empty() {
            return Err(ReferenceError::invalid_range(index, "guideline is empty"));
        }

        let age_lower_months = record
            .age_unit
            .to_months(record.age_lower)
            .ok_or_else(|| ReferenceError::invalid_range(index, "age_lower overflows months"))?;
        let age_upper_months = record
            .age_unit
            .to_months(record.age_upper)
            .ok_or_else(|| ReferenceError::invalid_range(index, "age_upper overflows months"))?;
        if age_lower_months > age_upper_months {
            return Err(ReferenceError::invalid_range(
                index,
                format!(
                    "age_lower ({age_lower_months} months) exceeds age_upper \
                     ({age_upper_months} months)"
                ),
            ));
        }

        let canonical = record.test_type.canonical_unit();
        let source_unit = record.unit.unwrap_or(canonical);
        let to_canonical = |v: f64| -> Result<f64, ReferenceError> {
            if !v.is_finite() || v < 0.0 {
                return Err(ReferenceError::invalid_range(
                    index,
                    format!("bound {v} must be a finite non-negative number"),
                ));
            }
            source_unit.convert(v, canonical).ok_or_else(|| {
                ReferenceError::invalid_range(
                    index,
                    format!(
                        "unit {source_unit} cannot express {} (expected {canonical})",
                        record.test_type
                    ),
                )
            })
        };

        let max_value = to_canonical(record.max_value)?;
        let min_value = record.min_value.map(to_canonical).transpose()?;
        if let Some(min) = min_value {
            if min > max_value {
                return Err(ReferenceError::invalid_range(
                    index,
                    format!("min_value ({min}) exceeds max_value ({max_value})"),
                ));
            }
        }

        Ok(Self {
            guideline: guideline.to_string(),
            test_type: record.test_type,
            age_lower_months,
            age_upper_months,
            min_value,
            max_value,
            unit: canonical,
            citation: record.citation.filter(|c| !c.trim().is_empty()),
            notes: record.notes.filter(|n| !n.trim().is_empty()),
        })
    }

    pub fn covers_age(&self, age_in_months: u32) -> bool {
        self.age_lower_months <= age_in_months && age_in_months <= self.age_upper_months
    }

    /// Guideline names match when equal after trimming, ignoring ASCII case.
    pub fn matches_guideline(&self, guideline: &str) -> bool {
        self.guideline.eq_ignore_ascii_case(guideline.trim())
    }

    /// True when both ranges describe the same (guideline, test type) and
    /// their age bands share at least one month.
    pub fn overlaps(&self, other: &ReferenceRange) -> bool {
        self.test_type == other.test_type
            && self.matches_guideline(&other.guideline)
            && self.age_lower_months <= other.age_upper_months
            && other.age_lower_months <= self.age_upper_months
    }

    /// Human-readable interval, e.g. `0.3-1.2 g/L` or `<= 100 IU/mL`.
    pub fn display_interval(&self) -> String {
        match self.min_value {
            Some(min) => format!("{min}-{} {}", self.max_value, self.unit),
            None => format!("<= {} {}", self.max_value, self.unit),
        }
    }
}
