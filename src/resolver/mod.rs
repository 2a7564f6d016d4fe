//! Reference-range resolution and result classification.
//!
//! Everything here is pure: reference data comes in as an immutable snapshot,
//! nothing is logged or cached, and every call can run concurrently.

pub mod age;
pub mod classify;
pub mod trend;

pub use age::age_in_months;
pub use classify::classify;
pub use trend::{compute_trend, compute_trend_with_threshold};

use crate::error::ReferenceError;
use crate::models::{ClassificationResult, ReferenceRange, TestObservation, TestType};

/// Supplies reference ranges to a resolver, in a stable order.
pub trait RangeSource {
    fn ranges(&self) -> &[ReferenceRange];
}

impl RangeSource for [ReferenceRange] {
    fn ranges(&self) -> &[ReferenceRange] {
        self
    }
}

impl RangeSource for Vec<ReferenceRange> {
    fn ranges(&self) -> &[ReferenceRange] {
        self
    }
}

/// Resolves reference ranges from a borrowed snapshot.
#[derive(Debug, Clone, Copy)]
pub struct ReferenceResolver<'a> {
    ranges: &'a [ReferenceRange],
}

impl<'a> ReferenceResolver<'a> {
    pub fn new<S: RangeSource + ?Sized>(source: &'a S) -> Self {
        Self {
            ranges: source.ranges(),
        }
    }

    /// Find the range for `(test_type, guideline)` whose age band contains
    /// `age_in_months`.
    ///
    /// When bands overlap, the first one in source order wins. `Ok(None)` means
    /// no range covers the age; the resolver never substitutes a default.
    pub fn resolve_range(
        &self,
        test_type: TestType,
        age_in_months: i64,
        guideline: &str,
    ) -> Result<Option<&'a ReferenceRange>, ReferenceError> {
        let guideline = require_guideline(guideline)?;
        if age_in_months < 0 {
            return Err(ReferenceError::invalid_input(
                "age_in_months",
                format!("{age_in_months} must not be negative"),
            ));
        }
        // Ages beyond u32 cannot fall inside any stored band.
        let Ok(age) = u32::try_from(age_in_months) else {
            return Ok(None);
        };

        Ok(self.ranges.iter().find(|r| {
            r.test_type == test_type && r.matches_guideline(guideline) && r.covers_age(age)
        }))
    }

    /// Resolve and classify one observation in a single step.
    pub fn classify_observation(
        &self,
        observation: &TestObservation,
        guideline: &str,
    ) -> Result<ClassificationResult, ReferenceError> {
        let range = self.resolve_range(
            observation.test_type,
            i64::from(observation.subject_age_months),
            guideline,
        )?;
        let status = classify(observation.value, range)?;
        Ok(ClassificationResult {
            status,
            matched_range: range.cloned(),
        })
    }
}

fn require_guideline(guideline: &str) -> Result<&str, ReferenceError> {
    let trimmed = guideline.trim();
    if trimmed.is_empty() {
        return Err(ReferenceError::invalid_input(
            "guideline",
            "an explicit guideline is required",
        ));
    }
    Ok(trimmed)
}
