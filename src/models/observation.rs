use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{MeasurementUnit, TestType};
use crate::error::ReferenceError;
use crate::resolver::age::age_in_months;

/// One measured immunoglobulin value, already in the test type's canonical unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestObservation {
    pub id: Uuid,
    pub test_type: TestType,
    pub value: f64,
    pub observed_at: NaiveDate,
    pub subject_age_months: u32,
}

impl TestObservation {
    /// Validate and normalize a reported value.
    ///
    /// `today` is the ingestion date; observations dated after it are rejected.
    pub fn new(
        test_type: TestType,
        value: f64,
        unit: MeasurementUnit,
        birth_date: NaiveDate,
        observed_at: NaiveDate,
        today: NaiveDate,
    ) -> Result<Self, ReferenceError> {
        validate_value("value", value)?;
        if observed_at > today {
            return Err(ReferenceError::invalid_input(
                "observed_at",
                format!("{observed_at} is in the future (today is {today})"),
            ));
        }
        if observed_at < birth_date {
            return Err(ReferenceError::invalid_input(
                "observed_at",
                format!("{observed_at} precedes birth date {birth_date}"),
            ));
        }

        let canonical = test_type.canonical_unit();
        let value = unit.convert(value, canonical).ok_or_else(|| {
            ReferenceError::invalid_input(
                "unit",
                format!("{unit} cannot express {test_type} (expected {canonical})"),
            )
        })?;

        // Month arithmetic ignores the day, so a same-month birth yields 0.
        let age = age_in_months(birth_date, observed_at);
        let subject_age_months = u32::try_from(age).map_err(|_| {
            ReferenceError::invalid_input("observed_at", "subject age is negative")
        })?;

        Ok(Self {
            id: Uuid::new_v4(),
            test_type,
            value,
            observed_at,
            subject_age_months,
        })
    }
}

/// Reject NaN, infinities and negative measurements.
pub fn validate_value(field: &str, value: f64) -> Result<(), ReferenceError> {
    if !value.is_finite() {
        return Err(ReferenceError::invalid_input(field, "must be a finite number"));
    }
    if value < 0.0 {
        return Err(ReferenceError::invalid_input(
            field,
            format!("{value} must not be negative"),
        ));
    }
    Ok(())
}

/// The latest observation of the same test type dated strictly before `current`.
///
/// Among several observations on that latest date, the last one in `history`
/// order wins.
pub fn previous_observation<'a>(
    history: &'a [TestObservation],
    current: &TestObservation,
) -> Option<&'a TestObservation> {
    history
        .iter()
        .filter(|o| o.test_type == current.test_type && o.observed_at < current.observed_at)
        .max_by_key(|o| o.observed_at)
}
