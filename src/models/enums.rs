use crate::error::ReferenceError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Macro to generate enum with as_str + std::str::FromStr pattern.
/// Parsing is ASCII case-insensitive; serde uses the canonical label.
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$(Self::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = ReferenceError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Err(ReferenceError::invalid_input(
                        stringify!($name),
                        "must not be empty",
                    ));
                }
                $(
                    if trimmed.eq_ignore_ascii_case($s) {
                        return Ok(Self::$variant);
                    }
                )+
                Err(ReferenceError::invalid_input(
                    stringify!($name),
                    format!("unrecognized value '{trimmed}'"),
                ))
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

str_enum!(TestType {
    IgA => "IgA",
    IgM => "IgM",
    IgG => "IgG",
    IgG1 => "IgG1",
    IgG2 => "IgG2",
    IgG3 => "IgG3",
    IgG4 => "IgG4",
    IgE => "IgE",
});

str_enum!(AgeUnit {
    Months => "months",
    Years => "years",
});

str_enum!(MeasurementUnit {
    GramsPerLiter => "g/L",
    MilligramsPerDeciliter => "mg/dL",
    InternationalUnitsPerMl => "IU/mL",
    KilounitsPerLiter => "kU/L",
});

str_enum!(RangeStatus {
    Low => "low",
    Normal => "normal",
    High => "high",
    Unknown => "unknown",
});

str_enum!(TrendDirection {
    Up => "up",
    Down => "down",
    Flat => "flat",
    Unknown => "unknown",
});

impl TestType {
    /// Unit every stored range and observation of this test type is expressed in.
    pub fn canonical_unit(&self) -> MeasurementUnit {
        match self {
            Self::IgE => MeasurementUnit::InternationalUnitsPerMl,
            _ => MeasurementUnit::GramsPerLiter,
        }
    }
}

impl AgeUnit {
    pub fn to_months(&self, amount: u32) -> Option<u32> {
        match self {
            Self::Months => Some(amount),
            Self::Years => amount.checked_mul(12),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dimension {
    MassConcentration,
    ActivityConcentration,
}

impl MeasurementUnit {
    fn dimension(&self) -> Dimension {
        match self {
            Self::GramsPerLiter | Self::MilligramsPerDeciliter => Dimension::MassConcentration,
            Self::InternationalUnitsPerMl | Self::KilounitsPerLiter => {
                Dimension::ActivityConcentration
            }
        }
    }

    /// How many of this unit make up one of the dimension's base unit
    /// (g/L or IU/mL). Whole numbers only: conversion divides by them, so
    /// 70 mg/dL becomes the nearest `f64` to 0.7 g/L.
    fn per_base_unit(&self) -> f64 {
        match self {
            Self::GramsPerLiter => 1.0,
            Self::MilligramsPerDeciliter => 100.0,
            Self::InternationalUnitsPerMl | Self::KilounitsPerLiter => 1.0,
        }
    }

    /// Convert `value` from this unit into `target`.
    /// Returns `None` when the units measure different quantities.
    pub fn convert(&self, value: f64, target: MeasurementUnit) -> Option<f64> {
        if self.dimension() != target.dimension() {
            return None;
        }
        if *self == target {
            return Some(value);
        }
        let (from, to) = (self.per_base_unit(), target.per_base_unit());
        if from == to {
            Some(value)
        } else if from > to {
            Some(value / (from / to))
        } else {
            Some(value * (to / from))
        }
    }
}

impl RangeStatus {
    pub fn is_abnormal(&self) -> bool {
        matches!(self, Self::Low | Self::High)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_type_parses_case_insensitively() {
        assert_eq!(TestType::from_str("IgA").unwrap(), TestType::IgA);
        assert_eq!(TestType::from_str("iga").unwrap(), TestType::IgA);
        assert_eq!(TestType::from_str(" IGG3 ").unwrap(), TestType::IgG3);
    }

    #[test]
    fn test_type_rejects_empty_and_unknown() {
        let empty = TestType::from_str("  ").unwrap_err();
        assert!(empty.is_invalid_input());
        let unknown = TestType::from_str("IgZ").unwrap_err();
        assert!(unknown.to_string().contains("IgZ"));
    }

    #[test]
    fn every_test_type_round_trips_through_label() {
        for variant in TestType::ALL {
            assert_eq!(TestType::from_str(variant.as_str()).unwrap(), *variant);
        }
    }

    #[test]
    fn ige_uses_activity_unit() {
        assert_eq!(
            TestType::IgE.canonical_unit(),
            MeasurementUnit::InternationalUnitsPerMl
        );
        assert_eq!(TestType::IgG2.canonical_unit(), MeasurementUnit::GramsPerLiter);
    }

    #[test]
    fn years_convert_to_months() {
        assert_eq!(AgeUnit::Years.to_months(3), Some(36));
        assert_eq!(AgeUnit::Months.to_months(7), Some(7));
        assert_eq!(AgeUnit::Years.to_months(u32::MAX), None);
    }

    #[test]
    fn mg_per_dl_converts_to_g_per_l() {
        let g = MeasurementUnit::MilligramsPerDeciliter
            .convert(700.0, MeasurementUnit::GramsPerLiter)
            .unwrap();
        assert_eq!(g, 7.0);
        let mg = MeasurementUnit::GramsPerLiter
            .convert(0.5, MeasurementUnit::MilligramsPerDeciliter)
            .unwrap();
        assert_eq!(mg, 50.0);
    }

    #[test]
    fn mg_per_dl_bounds_convert_to_exact_decimals() {
        let mg = MeasurementUnit::MilligramsPerDeciliter;
        assert_eq!(mg.convert(70.0, MeasurementUnit::GramsPerLiter), Some(0.7));
        assert_eq!(mg.convert(230.0, MeasurementUnit::GramsPerLiter), Some(2.3));
        assert_eq!(mg.convert(350.0, MeasurementUnit::GramsPerLiter), Some(3.5));
        assert_eq!(mg.convert(40.0, MeasurementUnit::GramsPerLiter), Some(0.4));
        assert_eq!(MeasurementUnit::GramsPerLiter.convert(2.5, mg), Some(250.0));
    }

    #[test]
    fn incompatible_units_do_not_convert() {
        assert!(MeasurementUnit::GramsPerLiter
            .convert(1.0, MeasurementUnit::InternationalUnitsPerMl)
            .is_none());
        assert_eq!(
            MeasurementUnit::KilounitsPerLiter
                .convert(42.0, MeasurementUnit::InternationalUnitsPerMl),
            Some(42.0)
        );
    }

    #[test]
    fn enums_serialize_as_labels() {
        let json = serde_json::to_string(&MeasurementUnit::MilligramsPerDeciliter).unwrap();
        assert_eq!(json, "\"mg/dL\"");
        let status: RangeStatus = serde_json::from_str("\"HIGH\"").unwrap();
        assert_eq!(status, RangeStatus::High);
        assert!(serde_json::from_str::<AgeUnit>("\"weeks\"").is_err());
    }

    #[test]
    fn only_low_and_high_are_abnormal() {
        assert!(RangeStatus::Low.is_abnormal());
        assert!(RangeStatus::High.is_abnormal());
        assert!(!RangeStatus::Normal.is_abnormal());
        assert!(!RangeStatus::Unknown.is_abnormal());
    }
}
