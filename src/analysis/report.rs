use std::fmt::Write;

use super::PanelAnalysis;
use crate::models::RangeStatus;

/// Render a plain-text clinical immunology report for a panel analysis.
pub fn render_report(analysis: &PanelAnalysis) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = write_report(&mut out, analysis);
    out
}

fn write_report(out: &mut String, analysis: &PanelAnalysis) -> std::fmt::Result {
    writeln!(out, "Clinical Immunology Report")?;
    if let Some(date) = analysis.latest_observed_at() {
        writeln!(out, "Date: {date}")?;
    }
    if let Some(age) = analysis.latest_age_months() {
        writeln!(out, "Patient Age: {}", format_age(age))?;
    }
    writeln!(out, "Guideline: {}", analysis.guideline)?;

    writeln!(out, "\nTest Results:")?;
    for finding in &analysis.findings {
        let reference = match &finding.classification.matched_range {
            Some(range) => range.display_interval(),
            None => "no reference range".to_string(),
        };
        write!(
            out,
            "{}: {} {} (Reference: {}) [{}]",
            finding.test_type,
            finding.value,
            finding.unit,
            reference,
            finding.classification.status
        )?;
        if let Some(percent) = finding.trend.percent_change {
            write!(out, " trend {} {:+.1}%", finding.trend.direction, percent)?;
        }
        writeln!(out)?;
    }

    write_section(out, "Abnormal Values", &analysis.abnormal_values)?;
    write_section(out, "Trends", &analysis.notable_trends)?;

    if !analysis.unresolved.is_empty() {
        let names: Vec<&str> = analysis.unresolved.iter().map(|t| t.as_str()).collect();
        writeln!(
            out,
            "\nNot Classified:\n- No {} reference range for {}",
            analysis.guideline,
            names.join(", ")
        )?;
    }

    writeln!(out, "\nClinical Interpretation:")?;
    if analysis.summary.is_empty() {
        let all_normal = analysis
            .findings
            .iter()
            .all(|f| f.classification.status == RangeStatus::Normal);
        if all_normal {
            writeln!(out, "- All values within reference range")?;
        }
    }
    for line in &analysis.summary {
        writeln!(out, "- {line}")?;
    }

    writeln!(out, "\nRecommendations:")?;
    for line in &analysis.recommendations {
        writeln!(out, "- {line}")?;
    }
    Ok(())
}

fn write_section(out: &mut String, title: &str, lines: &[String]) -> std::fmt::Result {
    if lines.is_empty() {
        return Ok(());
    }
    writeln!(out, "\n{title}:")?;
    for line in lines {
        writeln!(out, "- {line}")?;
    }
    Ok(())
}

/// Months under two years stay in months; older ages read as years + months.
pub fn format_age(months: u32) -> String {
    if months < 24 {
        return format!("{months} months");
    }
    let (years, rest) = (months / 12, months % 12);
    if rest == 0 {
        format!("{years} years")
    } else {
        format!("{years} years {rest} months")
    }
}
