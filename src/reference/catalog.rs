use std::path::Path;

use serde::Serialize;

use crate::config::BUNDLED_RANGES_SOURCE;
use crate::error::ReferenceError;
use crate::models::{RangeRecord, ReferenceRange, TestType};
use crate::resolver::{RangeSource, ReferenceResolver};

static BUNDLED_RANGES_JSON: &str = include_str!("../../resources/reference_ranges.json");

/// Two ranges of the same (guideline, test type) whose age bands intersect.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeOverlap {
    pub guideline: String,
    pub test_type: TestType,
    /// Index of the range that wins resolution (earlier in catalog order).
    pub first: usize,
    pub second: usize,
    pub from_month: u32,
    pub to_month: u32,
}

/// Validated, unit-normalized reference ranges in their source order.
///
/// The catalog is immutable once built; hand out `resolver()` snapshots.
#[derive(Debug, Clone)]
pub struct ReferenceCatalog {
    source: String,
    ranges: Vec<ReferenceRange>,
}

impl ReferenceCatalog {
    /// Validate and normalize raw records. The first invalid record aborts ingestion.
    pub fn from_records(source: &str, records: Vec<RangeRecord>) -> Result<Self, ReferenceError> {
        let ranges = records
            .into_iter()
            .enumerate()
            .map(|(index, record)| ReferenceRange::from_record(index, record))
            .collect::<Result<Vec<_>, _>>()?;

        let catalog = Self {
            source: source.to_string(),
            ranges,
        };

        if catalog.ranges.is_empty() {
            tracing::warn!(source, "Reference catalog is empty; every lookup will be unknown");
        }
        let overlaps = catalog.overlaps();
        if !overlaps.is_empty() {
            tracing::warn!(
                source,
                count = overlaps.len(),
                "Reference catalog has overlapping age bands; earlier ranges take precedence"
            );
            for o in &overlaps {
                tracing::debug!(
                    guideline = %o.guideline,
                    test_type = %o.test_type,
                    first = o.first,
                    second = o.second,
                    from_month = o.from_month,
                    to_month = o.to_month,
                    "Overlapping age band"
                );
            }
        }
        tracing::info!(
            source,
            ranges = catalog.ranges.len(),
            guidelines = catalog.guidelines().len(),
            "Reference catalog loaded"
        );

        Ok(catalog)
    }

    /// Parse a JSON array of range records.
    pub fn from_json(source: &str, json: &str) -> Result<Self, ReferenceError> {
        let records: Vec<RangeRecord> = serde_json::from_str(json)
            .map_err(|e| ReferenceError::DataParse(source.to_string(), e.to_string()))?;
        Self::from_records(source, records)
    }

    /// Load reference data from a JSON file on disk.
    pub fn load(path: &Path) -> Result<Self, ReferenceError> {
        let shown = path.display().to_string();
        tracing::debug!(path = %shown, "Reading reference ranges");
        let json = std::fs::read_to_string(path)
            .map_err(|e| ReferenceError::DataLoad(shown.clone(), e.to_string()))?;
        Self::from_json(&shown, &json)
    }

    /// Reference data compiled into the binary.
    pub fn bundled() -> Result<Self, ReferenceError> {
        Self::from_json(BUNDLED_RANGES_SOURCE, BUNDLED_RANGES_JSON)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn resolver(&self) -> ReferenceResolver<'_> {
        ReferenceResolver::new(self)
    }

    /// Distinct guideline names, in first-seen order.
    pub fn guidelines(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for range in &self.ranges {
            if !names.iter().any(|n| n.eq_ignore_ascii_case(&range.guideline)) {
                names.push(&range.guideline);
            }
        }
        names
    }

    /// Test types covered by `guideline`, in first-seen order.
    pub fn test_types_for(&self, guideline: &str) -> Vec<TestType> {
        let mut types = Vec::new();
        for range in self.ranges.iter().filter(|r| r.matches_guideline(guideline)) {
            if !types.contains(&range.test_type) {
                types.push(range.test_type);
            }
        }
        types
    }

    /// All bands for one (test type, guideline), in catalog order.
    pub fn ranges_for(&self, test_type: TestType, guideline: &str) -> Vec<&ReferenceRange> {
        self.ranges
            .iter()
            .filter(|r| r.test_type == test_type && r.matches_guideline(guideline))
            .collect()
    }

    /// Every pair of intersecting bands within the same (guideline, test type).
    pub fn overlaps(&self) -> Vec<RangeOverlap> {
        let mut found = Vec::new();
        for (i, a) in self.ranges.iter().enumerate() {
            for (j, b) in self.ranges.iter().enumerate().skip(i + 1) {
                if a.overlaps(b) {
                    found.push(RangeOverlap {
                        guideline: a.guideline.clone(),
                        test_type: a.test_type,
                        first: i,
                        second: j,
                        from_month: a.age_lower_months.max(b.age_lower_months),
                        to_month: a.age_upper_months.min(b.age_upper_months),
                    });
                }
            }
        }
        found
    }
}

impl RangeSource for ReferenceCatalog {
    fn ranges(&self) -> &[ReferenceRange] {
        &self.ranges
    }
}
