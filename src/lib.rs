pub mod analysis; // Panel analysis + clinical report
pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod reference; // Reference catalog ingestion
pub mod resolver; // Range resolution, classification, trend

pub use error::ReferenceError;
pub use models::{
    ClassificationResult, RangeStatus, ReferenceRange, TestObservation, TestType, TrendDirection,
    TrendResult,
};
pub use reference::ReferenceCatalog;
pub use resolver::{age_in_months, classify, compute_trend, RangeSource, ReferenceResolver};

use clap::Parser;
use tracing_subscriber::EnvFilter;

/// CLI entry point: parse arguments, load the catalog, print the command output.
pub fn run() -> anyhow::Result<()> {
    // Initialize tracing; stderr keeps stdout clean for JSON output
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    let cli = cli::Cli::parse();
    tracing::debug!("{} v{}", config::APP_NAME, config::APP_VERSION);

    let catalog = cli::load_catalog(cli.ranges.clone())?;
    let output = cli::execute(&cli.command, &catalog)?;
    println!("{output}");
    Ok(())
}
