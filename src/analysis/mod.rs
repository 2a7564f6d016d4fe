//! Panel analysis: classify every value of a test panel, compare it with the
//! previous result of the same test, and derive findings and recommendations.

pub mod report;

pub use report::render_report;

use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::config::NOTABLE_CHANGE_PERCENT;
use crate::error::ReferenceError;
use crate::models::{
    previous_observation, ClassificationResult, MeasurementUnit, RangeStatus, TestObservation,
    TestType, TrendDirection, TrendResult,
};
use crate::resolver::{compute_trend, ReferenceResolver};

const FOLLOW_UP_TESTING: &str = "Consider follow-up testing to confirm results";
const REVIEW_HISTORY: &str = "Review patient history for recent infections or changes";
const MONITOR_INFECTION: &str = "Monitor for symptoms of infection or inflammation";
const EVALUATE_IMMUNODEFICIENCY: &str = "Evaluate for possible immunodeficiency";

#[derive(Debug, Clone, Serialize)]
pub struct PanelFinding {
    pub observation_id: Uuid,
    pub test_type: TestType,
    pub value: f64,
    pub unit: MeasurementUnit,
    pub observed_at: NaiveDate,
    pub subject_age_months: u32,
    pub classification: ClassificationResult,
    pub previous_value: Option<f64>,
    pub trend: TrendResult,
}

#[derive(Debug, Clone, Serialize)]
pub struct PanelAnalysis {
    pub guideline: String,
    pub findings: Vec<PanelFinding>,
    pub abnormal_values: Vec<String>,
    /// Test types with no reference range for the subject's age.
    pub unresolved: Vec<TestType>,
    pub summary: Vec<String>,
    pub notable_trends: Vec<String>,
    pub recommendations: Vec<String>,
}

impl PanelAnalysis {
    pub fn has_abnormal(&self) -> bool {
        self.findings
            .iter()
            .any(|f| f.classification.status.is_abnormal())
    }

    /// Date of the most recent observation in the panel.
    pub fn latest_observed_at(&self) -> Option<NaiveDate> {
        self.findings.iter().map(|f| f.observed_at).max()
    }

    /// Subject age at the most recent observation in the panel.
    pub fn latest_age_months(&self) -> Option<u32> {
        self.findings
            .iter()
            .max_by_key(|f| f.observed_at)
            .map(|f| f.subject_age_months)
    }
}

/// Analyze `current` against `guideline`, pairing each value with the
/// preceding observation of the same test type found in `history`.
pub fn analyze_panel(
    resolver: &ReferenceResolver<'_>,
    guideline: &str,
    current: &[TestObservation],
    history: &[TestObservation],
) -> Result<PanelAnalysis, ReferenceError> {
    if current.is_empty() {
        return Err(ReferenceError::invalid_input(
            "observations",
            "panel has no observations",
        ));
    }

    let mut analysis = PanelAnalysis {
        guideline: guideline.trim().to_string(),
        findings: Vec::with_capacity(current.len()),
        abnormal_values: Vec::new(),
        unresolved: Vec::new(),
        summary: Vec::new(),
        notable_trends: Vec::new(),
        recommendations: Vec::new(),
    };

    let mut trend_recommendations = Vec::new();
    for observation in current {
        let classification = resolver.classify_observation(observation, guideline)?;
        let previous_value = previous_observation(history, observation).map(|p| p.value);
        let trend = compute_trend(observation.value, previous_value)?;

        record_status(&mut analysis, observation, classification.status);
        if let Some(recommendation) = record_trend(&mut analysis, observation.test_type, &trend) {
            trend_recommendations.push(recommendation);
        }

        analysis.findings.push(PanelFinding {
            observation_id: observation.id,
            test_type: observation.test_type,
            value: observation.value,
            unit: observation.test_type.canonical_unit(),
            observed_at: observation.observed_at,
            subject_age_months: observation.subject_age_months,
            classification,
            previous_value,
            trend,
        });
    }

    if !analysis.abnormal_values.is_empty() {
        push_unique(&mut analysis.recommendations, FOLLOW_UP_TESTING);
        push_unique(&mut analysis.recommendations, REVIEW_HISTORY);
    }
    for recommendation in trend_recommendations {
        push_unique(&mut analysis.recommendations, recommendation);
    }

    Ok(analysis)
}

fn record_status(analysis: &mut PanelAnalysis, observation: &TestObservation, status: RangeStatus) {
    let test = observation.test_type;
    let shown = format!("{} {}", observation.value, test.canonical_unit());
    match status {
        RangeStatus::Low => {
            analysis.abnormal_values.push(format!("{test} is low ({shown})"));
            analysis
                .summary
                .push(format!("Low {test} levels may indicate immune deficiency"));
        }
        RangeStatus::High if test == TestType::IgE => {
            analysis.abnormal_values.push(format!("{test} is elevated ({shown})"));
            analysis.summary.push(format!(
                "Elevated {test} levels may indicate allergic response or parasitic infection"
            ));
        }
        RangeStatus::High => {
            analysis.abnormal_values.push(format!("{test} is high ({shown})"));
            analysis.summary.push(format!(
                "High {test} levels may indicate infection or autoimmune condition"
            ));
        }
        RangeStatus::Unknown => {
            if !analysis.unresolved.contains(&test) {
                analysis.unresolved.push(test);
            }
        }
        RangeStatus::Normal => {}
    }
}

/// Note a notable change and return the recommendation it calls for.
/// Abnormal-value recommendations are listed before trend ones.
fn record_trend(
    analysis: &mut PanelAnalysis,
    test: TestType,
    trend: &TrendResult,
) -> Option<&'static str> {
    let percent = trend.percent_change?;
    if percent.abs() < NOTABLE_CHANGE_PERCENT {
        return None;
    }
    let (verb, recommendation) = match trend.direction {
        TrendDirection::Up => ("increased", MONITOR_INFECTION),
        TrendDirection::Down => ("decreased", EVALUATE_IMMUNODEFICIENCY),
        TrendDirection::Flat | TrendDirection::Unknown => return None,
    };
    analysis.notable_trends.push(format!(
        "{test} has {verb} by {:.1}% since last test",
        percent.abs()
    ));
    Some(recommendation)
}

fn push_unique(list: &mut Vec<String>, item: &str) {
    if !list.iter().any(|existing| existing == item) {
        list.push(item.to_string());
    }
}
