use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::analysis::{analyze_panel, render_report};
use crate::config;
use crate::models::{
    validate_value, ClassificationResult, MeasurementUnit, ReferenceRange, TestObservation,
    TestType, TrendResult,
};
use crate::reference::{RangeOverlap, ReferenceCatalog};
use crate::resolver::{age_in_months, classify, compute_trend};

#[derive(Parser, Debug)]
#[command(
    name = "immunoref",
    version,
    about = "Immunoglobulin reference ranges and result classification",
    long_about = None
)]
pub struct Cli {
    /// Reference-range JSON file (falls back to $IMMUNOREF_RANGES,
    /// ~/.immunoref/reference_ranges.json, then the bundled catalog)
    #[arg(long, global = true, value_name = "FILE")]
    pub ranges: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the reference range that applies to a test at a given age
    Resolve {
        #[arg(long = "test", value_name = "TEST_TYPE")]
        test_type: TestType,
        #[arg(long)]
        guideline: String,
        #[command(flatten)]
        age: AgeArgs,
    },

    /// Classify a value as low / normal / high against its reference range
    Classify {
        #[arg(long = "test", value_name = "TEST_TYPE")]
        test_type: TestType,
        #[arg(long)]
        guideline: String,
        #[arg(long, allow_negative_numbers = true)]
        value: f64,
        /// Unit of --value and --previous (defaults to the test's canonical unit)
        #[arg(long)]
        unit: Option<MeasurementUnit>,
        /// Previous value of the same test, for the trend
        #[arg(long, allow_negative_numbers = true)]
        previous: Option<f64>,
        #[command(flatten)]
        age: AgeArgs,
    },

    /// Percent change and direction between two values
    Trend {
        #[arg(long, allow_negative_numbers = true)]
        current: f64,
        #[arg(long, allow_negative_numbers = true)]
        previous: Option<f64>,
    },

    /// List guidelines, their test types, and overlapping age bands
    Guidelines,

    /// List every age band for one test type under one guideline
    Ranges {
        #[arg(long = "test", value_name = "TEST_TYPE")]
        test_type: TestType,
        #[arg(long)]
        guideline: String,
    },

    /// Analyze a panel JSON file and print a clinical report
    Report {
        #[arg(long, value_name = "FILE")]
        panel: PathBuf,
        #[arg(long)]
        guideline: String,
        /// Emit the analysis as JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

/// Subject age, either directly in months or derived from two dates.
#[derive(Args, Debug, Clone)]
pub struct AgeArgs {
    #[arg(long, allow_negative_numbers = true, conflicts_with_all = ["birth_date", "observed"])]
    pub age_months: Option<i64>,
    #[arg(long, requires = "observed", value_name = "YYYY-MM-DD")]
    pub birth_date: Option<NaiveDate>,
    #[arg(long, requires = "birth_date", value_name = "YYYY-MM-DD")]
    pub observed: Option<NaiveDate>,
}

impl AgeArgs {
    fn months(&self) -> Result<i64> {
        match (self.age_months, self.birth_date, self.observed) {
            (Some(months), _, _) => Ok(months),
            (None, Some(birth), Some(observed)) => Ok(age_in_months(birth, observed)),
            _ => bail!("provide --age-months or both --birth-date and --observed"),
        }
    }
}

/// Panel file consumed by `report`.
#[derive(Debug, Deserialize)]
pub struct PanelFile {
    pub birth_date: NaiveDate,
    pub observations: Vec<PanelEntry>,
    #[serde(default)]
    pub history: Vec<PanelEntry>,
}

#[derive(Debug, Deserialize)]
pub struct PanelEntry {
    pub test_type: TestType,
    pub value: f64,
    pub observed_at: NaiveDate,
    #[serde(default)]
    pub unit: Option<MeasurementUnit>,
}

#[derive(Debug, Serialize)]
struct ClassifyOutput {
    test_type: TestType,
    guideline: String,
    age_months: i64,
    value: f64,
    unit: MeasurementUnit,
    classification: ClassificationResult,
    trend: TrendResult,
}

#[derive(Debug, Serialize)]
struct GuidelineSummary<'a> {
    name: &'a str,
    test_types: Vec<TestType>,
}

#[derive(Debug, Serialize)]
struct CatalogSummary<'a> {
    source: &'a str,
    ranges: usize,
    guidelines: Vec<GuidelineSummary<'a>>,
    overlaps: Vec<RangeOverlap>,
}

/// Load the catalog chosen by the configuration resolution order.
pub fn load_catalog(explicit: Option<PathBuf>) -> Result<ReferenceCatalog> {
    match config::reference_ranges_path(explicit) {
        Some(path) => ReferenceCatalog::load(&path)
            .with_context(|| format!("loading reference ranges from {}", path.display())),
        None => ReferenceCatalog::bundled().context("loading bundled reference ranges"),
    }
}

/// Run one command against `catalog` and return what should be printed.
pub fn execute(command: &Commands, catalog: &ReferenceCatalog) -> Result<String> {
    match command {
        Commands::Resolve {
            test_type,
            guideline,
            age,
        } => {
            let months = age.months()?;
            let range = catalog
                .resolver()
                .resolve_range(*test_type, months, guideline)?;
            match range {
                Some(range) => to_json(range),
                None => Ok(format!(
                    "No {guideline} reference range for {test_type} at {months} months"
                )),
            }
        }
        Commands::Classify {
            test_type,
            guideline,
            value,
            unit,
            previous,
            age,
        } => classify_command(catalog, *test_type, guideline, *value, *unit, *previous, age),
        Commands::Trend { current, previous } => to_json(&compute_trend(*current, *previous)?),
        Commands::Guidelines => {
            let summary = CatalogSummary {
                source: catalog.source(),
                ranges: catalog.len(),
                guidelines: catalog
                    .guidelines()
                    .into_iter()
                    .map(|name| GuidelineSummary {
                        name,
                        test_types: catalog.test_types_for(name),
                    })
                    .collect(),
                overlaps: catalog.overlaps(),
            };
            to_json(&summary)
        }
        Commands::Ranges {
            test_type,
            guideline,
        } => {
            let bands: Vec<&ReferenceRange> = catalog.ranges_for(*test_type, guideline);
            to_json(&bands)
        }
        Commands::Report {
            panel,
            guideline,
            json,
        } => report_command(catalog, panel, guideline, *json, Local::now().date_naive()),
    }
}

fn classify_command(
    catalog: &ReferenceCatalog,
    test_type: TestType,
    guideline: &str,
    value: f64,
    unit: Option<MeasurementUnit>,
    previous: Option<f64>,
    age: &AgeArgs,
) -> Result<String> {
    let canonical = test_type.canonical_unit();
    let unit = unit.unwrap_or(canonical);
    let to_canonical = |field: &str, v: f64| -> Result<f64> {
        validate_value(field, v)?;
        unit.convert(v, canonical)
            .with_context(|| format!("{unit} cannot express {test_type} (expected {canonical})"))
    };
    let value = to_canonical("value", value)?;
    let previous = previous.map(|p| to_canonical("previous", p)).transpose()?;

    let months = age.months()?;
    let range = catalog
        .resolver()
        .resolve_range(test_type, months, guideline)?;
    let status = classify(value, range)?;
    let trend = compute_trend(value, previous)?;

    to_json(&ClassifyOutput {
        test_type,
        guideline: guideline.trim().to_string(),
        age_months: months,
        value,
        unit: canonical,
        classification: ClassificationResult {
            status,
            matched_range: range.cloned(),
        },
        trend,
    })
}

fn report_command(
    catalog: &ReferenceCatalog,
    panel_path: &Path,
    guideline: &str,
    json: bool,
    today: NaiveDate,
) -> Result<String> {
    let raw = std::fs::read_to_string(panel_path)
        .with_context(|| format!("reading panel {}", panel_path.display()))?;
    let panel: PanelFile = serde_json::from_str(&raw)
        .with_context(|| format!("parsing panel {}", panel_path.display()))?;

    let to_observations = |entries: &[PanelEntry]| -> Result<Vec<TestObservation>> {
        entries
            .iter()
            .map(|e| {
                TestObservation::new(
                    e.test_type,
                    e.value,
                    e.unit.unwrap_or(e.test_type.canonical_unit()),
                    panel.birth_date,
                    e.observed_at,
                    today,
                )
                .with_context(|| format!("{} observation on {}", e.test_type, e.observed_at))
            })
            .collect()
    };
    let current = to_observations(&panel.observations)?;
    let history = to_observations(&panel.history)?;
    tracing::debug!(
        current = current.len(),
        history = history.len(),
        "Analyzing panel"
    );

    let analysis = analyze_panel(&catalog.resolver(), guideline, &current, &history)?;
    if json {
        to_json(&analysis)
    } else {
        Ok(render_report(&analysis))
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("serializing output")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    fn bundled() -> ReferenceCatalog {
        ReferenceCatalog::bundled().unwrap()
    }

    #[test]
    fn classify_high_iga_infant() {
        let cli = parse(&[
            "immunoref",
            "classify",
            "--test",
            "IgA",
            "--guideline",
            "Turk Med SCI",
            "--value",
            "0.6",
            "--age-months",
            "2",
        ]);
        let out = execute(&cli.command, &bundled()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(json["classification"]["status"], "high");
        assert_eq!(json["classification"]["matched_range"]["max_value"], 0.5);
        assert_eq!(json["trend"]["direction"], "unknown");
    }

    #[test]
    fn classify_converts_units_and_computes_trend() {
        let cli = parse(&[
            "immunoref",
            "classify",
            "--test",
            "igg",
            "--guideline",
            "Age Group Defaults",
            "--value",
            "800",
            "--previous",
            "1000",
            "--unit",
            "mg/dL",
            "--birth-date",
            "1990-06-01",
            "--observed",
            "2025-06-01",
        ]);
        let out = execute(&cli.command, &bundled()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(json["unit"], "g/L");
        assert_eq!(json["age_months"], 420);
        assert_eq!(json["classification"]["status"], "normal");
        assert_eq!(json["trend"]["direction"], "down");
    }

    #[test]
    fn classify_without_guideline_match_is_unknown() {
        let cli = parse(&[
            "immunoref",
            "classify",
            "--test",
            "IgA",
            "--guideline",
            "Turk Med SCI",
            "--value",
            "1.0",
            "--age-months",
            "999",
        ]);
        let out = execute(&cli.command, &bundled()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(json["classification"]["status"], "unknown");
        assert!(json["classification"]["matched_range"].is_null());
    }

    #[test]
    fn classify_trend_matches_trend_command_across_units() {
        let cli = parse(&[
            "immunoref",
            "classify",
            "--test",
            "IgA",
            "--guideline",
            "Age Group Defaults",
            "--value",
            "21",
            "--previous",
            "20",
            "--unit",
            "mg/dL",
            "--age-months",
            "360",
        ]);
        let out = execute(&cli.command, &bundled()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(json["classification"]["status"], "low");
        assert_eq!(json["trend"]["direction"], "up");
        assert_eq!(json["trend"]["percent_change"], 5.0);

        let cli = parse(&["immunoref", "trend", "--current", "21", "--previous", "20"]);
        let out = execute(&cli.command, &bundled()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(json["direction"], "up");
    }

    #[test]
    fn classify_at_converted_floor_is_normal() {
        let cli = parse(&[
            "immunoref",
            "classify",
            "--test",
            "IgA",
            "--guideline",
            "Age Group Defaults",
            "--value",
            "70",
            "--unit",
            "mg/dL",
            "--age-months",
            "360",
        ]);
        let out = execute(&cli.command, &bundled()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(json["value"], 0.7);
        assert_eq!(json["classification"]["status"], "normal");
        assert_eq!(json["classification"]["matched_range"]["min_value"], 0.7);
    }

    #[test]
    fn negative_age_is_rejected() {
        let cli = parse(&[
            "immunoref",
            "resolve",
            "--test",
            "IgA",
            "--guideline",
            "Turk Med SCI",
            "--age-months",
            "-3",
        ]);
        let err = execute(&cli.command, &bundled()).unwrap_err();
        assert!(err.to_string().contains("age_in_months"));
    }

    #[test]
    fn resolve_reports_not_found_in_text() {
        let cli = parse(&[
            "immunoref",
            "resolve",
            "--test",
            "IgG1",
            "--guideline",
            "Turkish Journal Pediatrics",
            "--age-months",
            "40",
        ]);
        let out = execute(&cli.command, &bundled()).unwrap();
        assert_eq!(
            out,
            "No Turkish Journal Pediatrics reference range for IgG1 at 40 months"
        );
    }

    #[test]
    fn age_months_conflicts_with_dates() {
        let result = Cli::try_parse_from([
            "immunoref",
            "resolve",
            "--test",
            "IgA",
            "--guideline",
            "G",
            "--age-months",
            "2",
            "--birth-date",
            "2024-01-01",
            "--observed",
            "2024-03-01",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn missing_age_is_an_error() {
        let cli = parse(&["immunoref", "resolve", "--test", "IgA", "--guideline", "G"]);
        assert!(execute(&cli.command, &bundled()).is_err());
    }

    #[test]
    fn unknown_test_type_fails_to_parse() {
        let result = Cli::try_parse_from([
            "immunoref",
            "ranges",
            "--test",
            "IgX",
            "--guideline",
            "G",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn trend_command_outputs_percent() {
        let cli = parse(&["immunoref", "trend", "--current", "80", "--previous", "100"]);
        let out = execute(&cli.command, &bundled()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(json["direction"], "down");
        assert_eq!(json["percent_change"], -20.0);
    }

    #[test]
    fn guidelines_command_lists_sources_and_overlaps() {
        let cli = parse(&["immunoref", "guidelines"]);
        let out = execute(&cli.command, &bundled()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(json["ranges"], 46);
        assert_eq!(json["guidelines"][0]["name"], "Turk Med SCI");
        assert_eq!(json["overlaps"].as_array().unwrap().len(), 6);
    }

    #[test]
    fn ranges_command_lists_bands() {
        let cli = parse(&["immunoref", "ranges", "--test", "IgM", "--guideline", "Turk Med SCI"]);
        let out = execute(&cli.command, &bundled()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(json.as_array().unwrap().len(), 6);
    }

    #[test]
    fn global_ranges_flag_is_parsed_after_subcommand() {
        let cli = parse(&["immunoref", "guidelines", "--ranges", "/tmp/r.json"]);
        assert_eq!(cli.ranges, Some(PathBuf::from("/tmp/r.json")));
    }

    #[test]
    fn report_command_renders_text_and_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("panel.json");
        std::fs::write(
            &path,
            r#"{
                "birth_date": "2024-01-05",
                "observations": [
                    {"test_type": "IgA", "value": 60, "unit": "mg/dL", "observed_at": "2024-03-20"},
                    {"test_type": "IgM", "value": 0.4, "observed_at": "2024-03-20"}
                ],
                "history": [
                    {"test_type": "IgM", "value": 0.3, "observed_at": "2024-02-01"}
                ]
            }"#,
        )
        .unwrap();
        let catalog = bundled();
        let today = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();

        let text = report_command(&catalog, &path, "Turk Med SCI", false, today).unwrap();
        assert!(text.contains("IgA: 0.6 g/L (Reference: 0-0.5 g/L) [high]"));
        assert!(text.contains("- IgM has increased by 33.3% since last test"));

        let json = report_command(&catalog, &path, "Turk Med SCI", true, today).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["findings"].as_array().unwrap().len(), 2);
        assert_eq!(value["findings"][1]["trend"]["direction"], "up");
    }

    #[test]
    fn report_rejects_future_observations() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("panel.json");
        std::fs::write(
            &path,
            r#"{"birth_date": "2024-01-05",
                "observations": [
                    {"test_type": "IgA", "value": 0.2, "observed_at": "2030-01-01"}
                ]}"#,
        )
        .unwrap();
        let today = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let err = report_command(&bundled(), &path, "Turk Med SCI", false, today).unwrap_err();
        assert!(format!("{err:#}").contains("future"));
    }

    #[test]
    fn load_catalog_prefers_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ranges.json");
        std::fs::write(
            &path,
            r#"[{"guideline":"Local","test_type":"IgE","age_lower":0,"age_upper":99,
                 "age_unit":"years","max_value":120}]"#,
        )
        .unwrap();
        let catalog = load_catalog(Some(path)).unwrap();
        assert_eq!(catalog.guidelines(), vec!["Local"]);
    }
}
