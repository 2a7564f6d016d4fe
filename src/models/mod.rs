pub mod enums;
pub mod observation;
pub mod reference_range;
pub mod result;

pub use enums::{AgeUnit, MeasurementUnit, RangeStatus, TestType, TrendDirection};
pub use observation::{previous_observation, validate_value, TestObservation};
pub use reference_range::{RangeRecord, ReferenceRange};
pub use result::{ClassificationResult, TrendResult};
