//! Run-level types: status, result, progress events and caller callbacks.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use strum_macros::EnumIter as EnumIterMacro;

use crate::aggregate::{aggregate, Summary};
use crate::compare::SiteComparisonResult;
use crate::config::{site_identity, SiteComparePair};
use crate::credentials::Credentials;

/// Type alias for the progress callback. Invoked once per processed pair.
pub type ProgressCallback = Option<Arc<dyn Fn(&ProgressEvent) + Send + Sync>>;

/// Re-authentication hook.
///
/// Receives a tenant id and returns a fresh credential, or `None` when the
/// user declined or sign-in failed.
pub type Reauthenticate = Arc<dyn Fn(&str) -> Option<Credentials> + Send + Sync>;

/// Type alias for the optional re-authentication callback passed to a run.
pub type ReauthenticateCallback = Option<Reauthenticate>;

/// Lifecycle of a run.
///
/// `Failed` and `Cancelled` runs can be continued.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIterMacro,
)]
pub enum RunStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Pending => "Pending",
            RunStatus::Running => "Running",
            RunStatus::Completed => "Completed",
            RunStatus::Failed => "Failed",
            RunStatus::Cancelled => "Cancelled",
        }
    }

    /// Whether a later run with continuation enabled picks up from this one.
    pub fn is_resumable(&self) -> bool {
        matches!(self, RunStatus::Failed | RunStatus::Cancelled)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The outcome of a comparison run, and the unit of persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub task_id: String,
    #[serde(default)]
    pub status: RunStatus,
    pub executed_at_utc: DateTime<Utc>,
    #[serde(default)]
    pub completed_at_utc: Option<DateTime<Utc>>,
    pub site_results: Vec<SiteComparisonResult>,
    pub throttle_retry_count: u32,
    #[serde(default)]
    pub execution_log: Vec<String>,
}

impl RunResult {
    /// An empty result for a run starting now.
    pub fn new(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            status: RunStatus::Pending,
            executed_at_utc: Utc::now(),
            completed_at_utc: None,
            site_results: Vec::new(),
            throttle_retry_count: 0,
            execution_log: Vec::new(),
        }
    }

    /// Run-level statistics, recomputed from `site_results`.
    pub fn summary(&self) -> Summary {
        aggregate(&self.site_results)
    }

    /// Appends a timestamped line to the execution log and emits it at info level.
    pub fn record(&mut self, message: impl Into<String>) {
        let message = message.into();
        info!("{message}");
        self.push_log_line(message);
    }

    /// Like [`record`](Self::record), emitted at warn level.
    pub fn record_warning(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("{message}");
        self.push_log_line(message);
    }

    fn push_log_line(&mut self, message: String) {
        self.execution_log
            .push(format!("{} {}", Utc::now().format("%Y-%m-%dT%H:%M:%SZ"), message));
    }

    /// Source sites (by identity) that already compared successfully.
    pub fn completed_sites(&self) -> HashSet<String> {
        self.site_results
            .iter()
            .filter(|site| site.success)
            .map(|site| site_identity(&site.source_url))
            .collect()
    }

    /// Drops failed entries for configured pairs that are about to be retried.
    ///
    /// Successful entries and entries for pairs no longer configured are kept
    /// untouched.
    pub(crate) fn discard_retried_failures(&mut self, pairs: &[SiteComparePair]) {
        let retried: HashSet<String> = pairs.iter().map(SiteComparePair::resume_key).collect();
        self.site_results
            .retain(|site| site.success || !retried.contains(&site_identity(&site.source_url)));
    }

    /// Whether any configured pair has an unsuccessful entry.
    pub(crate) fn has_failures_among(&self, pairs: &[SiteComparePair]) -> bool {
        let configured: HashSet<String> = pairs.iter().map(SiteComparePair::resume_key).collect();
        self.site_results
            .iter()
            .any(|site| !site.success && configured.contains(&site_identity(&site.source_url)))
    }
}

/// Progress notification emitted after each processed pair.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    /// 0 to 100, never decreasing within a run
    pub percent_complete: u32,
    pub message: String,
    /// Result of the pair just processed; `None` for the initial resume event
    pub completed_site_result: Option<SiteComparisonResult>,
}

impl ProgressEvent {
    pub(crate) fn new(
        processed: usize,
        total: usize,
        message: String,
        completed_site_result: Option<SiteComparisonResult>,
    ) -> Self {
        Self {
            percent_complete: percent(processed, total),
            message,
            completed_site_result,
        }
    }
}

fn percent(processed: usize, total: usize) -> u32 {
    if total == 0 {
        return 100;
    }
    (processed.min(total) * 100 / total) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    fn site(source: &str, success: bool) -> SiteComparisonResult {
        let mut result =
            SiteComparisonResult::new(&SiteComparePair::new(source, "https://t.example.com"));
        result.success = success;
        result
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(0, 5), 0);
        assert_eq!(percent(2, 5), 40);
        assert_eq!(percent(5, 5), 100);
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(0, 0), 100);
    }

    #[test]
    fn test_resumable_statuses() {
        let resumable: Vec<_> = RunStatus::iter().filter(RunStatus::is_resumable).collect();
        assert_eq!(resumable, vec![RunStatus::Failed, RunStatus::Cancelled]);
    }

    #[test]
    fn test_completed_sites_ignores_case_and_trailing_slash() {
        let mut run = RunResult::new("t");
        run.site_results = vec![
            site("https://Contoso.sharepoint.com/sites/A/", true),
            site("https://contoso.sharepoint.com/sites/b", false),
        ];
        let completed = run.completed_sites();
        assert!(completed.contains("https://contoso.sharepoint.com/sites/a"));
        assert!(!completed.contains("https://contoso.sharepoint.com/sites/b"));
    }

    #[test]
    fn test_discard_retried_failures_keeps_other_entries() {
        let mut run = RunResult::new("t");
        run.site_results = vec![
            site("https://s.example.com/a", true),
            site("https://s.example.com/b", false),
            site("https://s.example.com/gone", false),
        ];
        let pairs = vec![
            SiteComparePair::new("https://s.example.com/a", "https://t.example.com/a"),
            SiteComparePair::new("https://s.example.com/b", "https://t.example.com/b"),
        ];
        run.discard_retried_failures(&pairs);

        let remaining: Vec<_> = run.site_results.iter().map(|s| s.source_url.as_str()).collect();
        assert_eq!(
            remaining,
            vec!["https://s.example.com/a", "https://s.example.com/gone"]
        );
        assert!(!run.has_failures_among(&pairs));
    }

    #[test]
    fn test_record_appends_to_execution_log() {
        let mut run = RunResult::new("t");
        run.record("started");
        run.record_warning("pair failed");
        assert_eq!(run.execution_log.len(), 2);
        assert!(run.execution_log[0].ends_with(" started"));
        assert!(run.execution_log[1].ends_with(" pair failed"));
    }

    #[test]
    fn test_run_result_deserializes_without_optional_fields() {
        let json = r#"{
            "taskId": "t",
            "executedAtUtc": "2024-03-01T12:00:00Z",
            "siteResults": [],
            "throttleRetryCount": 4
        }"#;
        let run: RunResult = serde_json::from_str(json).unwrap();
        assert_eq!(run.status, RunStatus::Pending);
        assert_eq!(run.throttle_retry_count, 4);
        assert!(run.execution_log.is_empty());
        assert!(run.completed_at_utc.is_none());
    }
}
