use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "immunoref";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable pointing at a reference-range JSON file.
pub const RANGES_ENV_VAR: &str = "IMMUNOREF_RANGES";

/// Label used as the source of the catalog compiled into the binary.
pub const BUNDLED_RANGES_SOURCE: &str = "bundled:reference_ranges.json";

/// Changes smaller than this (in percent, absolute) are reported as flat.
pub const TREND_FLAT_THRESHOLD_PERCENT: f64 = 5.0;

/// Changes at or above this (in percent, absolute) are called out in panel reports.
pub const NOTABLE_CHANGE_PERCENT: f64 = 20.0;

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "immunoref=info,immunoref_lib=info"
}

/// Get the application data directory (~/.immunoref/).
/// `None` when the home directory cannot be determined.
pub fn app_data_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(format!(".{APP_NAME}")))
}

/// User-provided reference ranges file inside the data directory.
pub fn user_ranges_file() -> Option<PathBuf> {
    app_data_dir().map(|dir| dir.join("reference_ranges.json"))
}

/// Resolve which reference-range file to load.
///
/// Order: explicit path, `IMMUNOREF_RANGES`, `~/.immunoref/reference_ranges.json`
/// when it exists. `None` means the bundled catalog should be used.
pub fn reference_ranges_path(explicit: Option<PathBuf>) -> Option<PathBuf> {
    resolve_ranges_path(
        explicit,
        std::env::var_os(RANGES_ENV_VAR).map(PathBuf::from),
        user_ranges_file(),
    )
}

fn resolve_ranges_path(
    explicit: Option<PathBuf>,
    from_env: Option<PathBuf>,
    user_file: Option<PathBuf>,
) -> Option<PathBuf> {
    explicit
        .or(from_env.filter(|p| !p.as_os_str().is_empty()))
        .or_else(|| user_file.filter(|p| p.is_file()))
}
