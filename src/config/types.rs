//! Configuration types and CLI options.
//!
//! This module defines the comparison task configuration, the retry settings
//! and the enums and structs used for command-line argument parsing.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::config::constants::{
    DB_PATH, RETRY_BASE_DELAY_MS, RETRY_MAX_DELAY_SECS, RETRY_MAX_RETRIES, SYSTEM_LIBRARIES,
};
use crate::error_handling::ValidationError;

/// `--log-level` values. Progress per pair is logged at info, skipped pairs
/// and cache hits at debug.
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => Self::Error,
            LogLevel::Warn => Self::Warn,
            LogLevel::Info => Self::Info,
            LogLevel::Debug => Self::Debug,
            LogLevel::Trace => Self::Trace,
        }
    }
}

/// `--log-format` values.
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Colored lines for a terminal
    Plain,
    /// One JSON object per line
    Json,
}

/// One source site paired with the target site it was migrated to.
///
/// The order of pairs in a configuration is the processing order and the
/// resume order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteComparePair {
    pub source_url: String,
    pub target_url: String,
}

impl SiteComparePair {
    pub fn new(source_url: impl Into<String>, target_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            target_url: target_url.into(),
        }
    }

    /// Identity used to match this pair against a previously persisted result.
    ///
    /// Case-insensitive and ignores a trailing slash.
    pub fn resume_key(&self) -> String {
        site_identity(&self.source_url)
    }
}

/// Canonical form of a site URL for identity comparisons.
pub(crate) fn site_identity(url: &str) -> String {
    url.trim().trim_end_matches('/').to_lowercase()
}

/// A comparison task definition.
///
/// # Examples
///
/// ```no_run
/// use site_compare::{ComparisonConfiguration, SiteComparePair};
///
/// let config = ComparisonConfiguration {
///     task_id: "contoso-wave-1".to_string(),
///     source_connection_id: "contoso".to_string(),
///     target_connection_id: "fabrikam".to_string(),
///     site_pairs: vec![SiteComparePair::new(
///         "https://contoso.sharepoint.com/sites/hr",
///         "https://fabrikam.sharepoint.com/sites/hr",
///     )],
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ComparisonConfiguration {
    /// Identity of the task; results are persisted under this key
    pub task_id: String,

    /// Tenant the source sites live in
    pub source_connection_id: String,

    /// Tenant the target sites live in
    pub target_connection_id: String,

    /// Site pairs, in processing order
    pub site_pairs: Vec<SiteComparePair>,

    /// Library titles to skip in addition to the system libraries
    pub excluded_libraries: BTreeSet<String>,

    /// Compare libraries the remote side reports as hidden
    pub include_hidden: bool,

    /// Compare site pages libraries and `.aspx` items
    pub include_aspx_pages: bool,

    /// Neutralize character substitution done by migration tools before matching paths
    pub use_normalization: bool,

    /// Reuse catalog snapshots younger than 48 hours
    pub use_cache: bool,
}

impl Default for ComparisonConfiguration {
    fn default() -> Self {
        Self {
            task_id: String::new(),
            source_connection_id: String::new(),
            target_connection_id: String::new(),
            site_pairs: Vec::new(),
            excluded_libraries: BTreeSet::new(),
            include_hidden: false,
            include_aspx_pages: false,
            use_normalization: true,
            use_cache: true,
        }
    }
}

impl ComparisonConfiguration {
    /// Checks that the configuration can be executed.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` if there are no site pairs, a connection id
    /// is missing, or a site URL is not an absolute http(s) URL.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.task_id.trim().is_empty() {
            return Err(ValidationError::MissingTaskId);
        }
        if self.source_connection_id.trim().is_empty() {
            return Err(ValidationError::MissingConnection("source"));
        }
        if self.target_connection_id.trim().is_empty() {
            return Err(ValidationError::MissingConnection("target"));
        }
        if self.site_pairs.is_empty() {
            return Err(ValidationError::NoSitePairs);
        }
        for pair in &self.site_pairs {
            validate_site_url(&pair.source_url)?;
            validate_site_url(&pair.target_url)?;
        }
        Ok(())
    }

    /// Excluded library titles, lowercased, always including the system libraries.
    pub fn effective_excluded_libraries(&self) -> BTreeSet<String> {
        SYSTEM_LIBRARIES
            .iter()
            .map(|title| title.to_lowercase())
            .chain(self.excluded_libraries.iter().map(|t| t.trim().to_lowercase()))
            .collect()
    }

    /// Whether a library with this title is excluded from comparison.
    pub fn is_library_excluded(&self, title: &str) -> bool {
        self.effective_excluded_libraries()
            .contains(&title.trim().to_lowercase())
    }
}

fn validate_site_url(raw: &str) -> Result<(), ValidationError> {
    let invalid = |reason: String| ValidationError::InvalidUrl {
        url: raw.to_string(),
        reason,
    };
    let parsed = url::Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => {}
        other => return Err(invalid(format!("unsupported scheme '{other}'"))),
    }
    if parsed.host_str().is_none() {
        return Err(invalid("missing host".to_string()));
    }
    Ok(())
}

/// Backoff parameters for throttled remote calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrySettings {
    /// Delay before the first retry; doubles on every retry
    pub base_delay: Duration,
    /// Upper bound on any single delay
    pub max_delay: Duration,
    /// Retries allowed after the initial attempt
    pub max_retries: usize,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(RETRY_BASE_DELAY_MS),
            max_delay: Duration::from_secs(RETRY_MAX_DELAY_SECS),
            max_retries: RETRY_MAX_RETRIES,
        }
    }
}

/// Command-line options for the `site_compare` binary.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "site_compare",
    version,
    about = "Compare migrated SharePoint sites between a source and a target tenant"
)]
pub struct Opt {
    /// Task definition (JSON-serialized comparison configuration)
    #[arg(long, conflicts_with = "pairs")]
    pub task: Option<PathBuf>,

    /// CSV file of site pairs (columns: SourceUrl,TargetUrl)
    #[arg(long, requires_all = ["source_tenant", "target_tenant"])]
    pub pairs: Option<PathBuf>,

    /// Task id used when building the task from --pairs
    #[arg(long, default_value = "cli")]
    pub task_id: String,

    /// Source tenant connection id
    #[arg(long)]
    pub source_tenant: Option<String>,

    /// Target tenant connection id
    #[arg(long)]
    pub target_tenant: Option<String>,

    /// Catalog snapshot export read by the offline catalog client
    #[arg(long)]
    pub catalog: PathBuf,

    /// SQLite database holding task results
    #[arg(long, default_value = DB_PATH)]
    pub db: PathBuf,

    /// Skip pairs that already succeeded in the latest stored result
    #[arg(long = "continue")]
    pub continue_from_previous: bool,

    /// Force a fresh scan of every library
    #[arg(long)]
    pub no_cache: bool,

    /// Compare paths literally, without character normalization
    #[arg(long)]
    pub no_normalization: bool,

    /// Include hidden libraries
    #[arg(long)]
    pub include_hidden: bool,

    /// Include site pages and .aspx items
    #[arg(long)]
    pub include_aspx: bool,

    /// Log level
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Log format
    #[arg(long, value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,
}

impl Opt {
    /// Applies the command-line switches on top of a task configuration.
    pub fn apply_overrides(&self, config: &mut ComparisonConfiguration) {
        if self.no_cache {
            config.use_cache = false;
        }
        if self.no_normalization {
            config.use_normalization = false;
        }
        if self.include_hidden {
            config.include_hidden = true;
        }
        if self.include_aspx {
            config.include_aspx_pages = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> ComparisonConfiguration {
        ComparisonConfiguration {
            task_id: "task-1".to_string(),
            source_connection_id: "contoso".to_string(),
            target_connection_id: "fabrikam".to_string(),
            site_pairs: vec![SiteComparePair::new(
                "https://contoso.sharepoint.com/sites/hr",
                "https://fabrikam.sharepoint.com/sites/hr",
            )],
            ..Default::default()
        }
    }

    #[test]
    fn test_log_level_maps_to_filter() {
        let filters: Vec<log::LevelFilter> = [LogLevel::Error, LogLevel::Info, LogLevel::Trace]
            .into_iter()
            .map(Into::into)
            .collect();
        assert_eq!(
            filters,
            vec![
                log::LevelFilter::Error,
                log::LevelFilter::Info,
                log::LevelFilter::Trace
            ]
        );
    }

    #[test]
    fn test_validate_accepts_complete_config() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_site_pairs() {
        let config = ComparisonConfiguration {
            site_pairs: Vec::new(),
            ..valid_config()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::NoSitePairs)
        ));
    }

    #[test]
    fn test_validate_rejects_missing_connection() {
        let config = ComparisonConfiguration {
            target_connection_id: "  ".to_string(),
            ..valid_config()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::MissingConnection("target"))
        ));
    }

    #[test]
    fn test_validate_rejects_non_http_url() {
        let mut config = valid_config();
        config.site_pairs[0].target_url = "ftp://fabrikam.example.com/hr".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("ftp://fabrikam.example.com/hr"));
    }

    #[test]
    fn test_validate_rejects_relative_url() {
        let mut config = valid_config();
        config.site_pairs[0].source_url = "/sites/hr".to_string();
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_system_libraries_always_excluded() {
        let config = valid_config();
        assert!(config.is_library_excluded("Style Library"));
        assert!(config.is_library_excluded("style library"));
        assert!(config.is_library_excluded("  Form Templates "));
        assert!(!config.is_library_excluded("Documents"));
    }

    #[test]
    fn test_configured_exclusions_are_added() {
        let mut config = valid_config();
        config.excluded_libraries.insert("Archive".to_string());
        assert!(config.is_library_excluded("ARCHIVE"));
        assert!(config.is_library_excluded("Master Page Gallery"));
    }

    #[test]
    fn test_resume_key_ignores_case_and_trailing_slash() {
        let a = SiteComparePair::new("https://Contoso.sharepoint.com/sites/HR/", "x");
        let b = SiteComparePair::new("https://contoso.sharepoint.com/sites/hr", "y");
        assert_eq!(a.resume_key(), b.resume_key());
    }

    #[test]
    fn test_configuration_deserializes_with_defaults() {
        let json = r#"{
            "taskId": "t",
            "sourceConnectionId": "contoso",
            "targetConnectionId": "fabrikam",
            "sitePairs": [{"sourceUrl": "https://a.example.com", "targetUrl": "https://b.example.com"}]
        }"#;
        let config: ComparisonConfiguration = serde_json::from_str(json).unwrap();
        assert!(config.use_normalization);
        assert!(config.use_cache);
        assert!(!config.include_hidden);
        assert_eq!(config.site_pairs.len(), 1);
    }

    #[test]
    fn test_opt_overrides() {
        let opt = Opt::parse_from([
            "site_compare",
            "--catalog",
            "catalog.json",
            "--task",
            "task.json",
            "--no-cache",
            "--include-aspx",
        ]);
        let mut config = valid_config();
        opt.apply_overrides(&mut config);
        assert!(!config.use_cache);
        assert!(config.include_aspx_pages);
        assert!(config.use_normalization);
        assert!(!config.include_hidden);
    }

    #[test]
    fn test_retry_settings_default() {
        let settings = RetrySettings::default();
        assert_eq!(settings.base_delay, Duration::from_millis(500));
        assert_eq!(settings.max_delay, Duration::from_secs(30));
        assert_eq!(settings.max_retries, 5);
    }
}
