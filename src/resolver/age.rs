use chrono::{Datelike, NaiveDate};

/// Age in whole months between a birth date and an observation date.
///
/// Only year and month are compared; the day of month is ignored, so a child
/// born on Jan 31 is one month old on Feb 1. Negative when `observed_at`
/// falls in an earlier month than `birth_date`.
pub fn age_in_months(birth_date: NaiveDate, observed_at: NaiveDate) -> i64 {
    let years = i64::from(observed_at.year()) - i64::from(birth_date.year());
    let months = i64::from(observed_at.month()) - i64::from(birth_date.month());
    years * 12 + months
}
