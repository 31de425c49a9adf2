//! Comparison run orchestration.
//!
//! [`ComparisonOrchestrator::run`] walks the configured site pairs one at a
//! time and moves the run through `Pending -> Running -> {Completed, Failed,
//! Cancelled}`. Per pair it:
//! 1. Checks the cancellation token
//! 2. Resolves both tenants' credentials, re-authenticating when needed
//! 3. Compares the pair, isolating failures and panics to that pair
//! 4. Appends the result, saves the run and emits a progress event
//!
//! A `Failed` or `Cancelled` run can be continued: pairs that already
//! succeeded are skipped and their results kept as they are.

mod types;

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::Utc;
use futures::FutureExt;
use log::{debug, warn};
use tokio_util::sync::CancellationToken;

use crate::cache::ScanCache;
use crate::catalog::RemoteCatalogClient;
use crate::compare::{PairComparer, PairCredentials, PairFailure, SiteComparisonResult};
use crate::config::{ComparisonConfiguration, RetrySettings, SiteComparePair, SCAN_CACHE_MAX_AGE};
use crate::credentials::{CredentialStore, Credentials};
use crate::error_handling::{EngineError, PairError};
use crate::retry::ThrottleRetryPolicy;
use crate::storage::TaskResultStore;

pub use types::{
    ProgressCallback, ProgressEvent, Reauthenticate, ReauthenticateCallback, RunResult, RunStatus,
};

/// Runs comparison tasks against a remote catalog.
///
/// The scan cache may be shared with other orchestrators; everything else a
/// run mutates is owned by that run.
pub struct ComparisonOrchestrator {
    client: Arc<dyn RemoteCatalogClient>,
    credentials: Arc<dyn CredentialStore>,
    store: Arc<dyn TaskResultStore>,
    cache: Arc<ScanCache>,
    retry_settings: RetrySettings,
}

impl ComparisonOrchestrator {
    pub fn new(
        client: Arc<dyn RemoteCatalogClient>,
        credentials: Arc<dyn CredentialStore>,
        store: Arc<dyn TaskResultStore>,
        cache: Arc<ScanCache>,
    ) -> Self {
        Self {
            client,
            credentials,
            store,
            cache,
            retry_settings: RetrySettings::default(),
        }
    }

    /// Overrides the throttling backoff used by this orchestrator's runs.
    pub fn with_retry_settings(mut self, retry_settings: RetrySettings) -> Self {
        self.retry_settings = retry_settings;
        self
    }

    /// Executes `config` and returns the run's result.
    ///
    /// Pair failures never surface here; they are recorded on the pair's
    /// result. Cancellation is checked before each pair and ends the run with
    /// status `Cancelled` and every completed pair kept.
    ///
    /// # Errors
    ///
    /// - `EngineError::Validation` if the configuration is malformed; nothing
    ///   is persisted.
    /// - `EngineError::Store` if the previous result cannot be loaded or the
    ///   final result cannot be saved.
    pub async fn run(
        &self,
        config: &ComparisonConfiguration,
        continue_from_previous: bool,
        on_progress: ProgressCallback,
        cancel: CancellationToken,
        reauthenticate: ReauthenticateCallback,
    ) -> Result<RunResult, EngineError> {
        config.validate()?;

        if config.use_cache {
            let purged = self.cache.purge_stale(SCAN_CACHE_MAX_AGE);
            if purged > 0 {
                debug!("Dropped {purged} stale catalog snapshots");
            }
        }

        let previous = if continue_from_previous {
            self.store.load_latest(&config.task_id).await?
        } else {
            None
        };

        let total = config.site_pairs.len();
        let mut run = match previous {
            Some(mut previous) => {
                previous.task_id = config.task_id.clone();
                previous.discard_retried_failures(&pending_pairs(config, &previous));
                previous
            }
            None => RunResult::new(&config.task_id),
        };
        let completed = run.completed_sites();
        let already_done = config
            .site_pairs
            .iter()
            .filter(|pair| completed.contains(&pair.resume_key()))
            .count();

        run.status = RunStatus::Running;
        run.completed_at_utc = None;
        if already_done > 0 {
            let message = format!(
                "Continuing task '{}': {} of {} site pairs already compared",
                config.task_id, already_done, total
            );
            run.record(message.clone());
            emit(&on_progress, ProgressEvent::new(already_done, total, message, None));
        } else {
            run.record(format!(
                "Starting task '{}' with {} site pairs",
                config.task_id, total
            ));
        }

        let retry = ThrottleRetryPolicy::with_initial_count(
            self.retry_settings,
            run.throttle_retry_count,
        );
        let mut processed = already_done;
        let mut cancelled = false;

        for pair in &config.site_pairs {
            if completed.contains(&pair.resume_key()) {
                debug!("Skipping {}: already compared", pair.source_url);
                continue;
            }
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            let result = self
                .compare_pair(config, pair, &retry, reauthenticate.as_ref())
                .await;
            processed += 1;
            run.throttle_retry_count = retry.retry_count();

            let message = if result.success {
                format!(
                    "[{processed}/{total}] Compared {} -> {}: {} items",
                    pair.source_url,
                    pair.target_url,
                    result.items.len()
                )
            } else {
                format!(
                    "[{processed}/{total}] Failed {} -> {}: {}",
                    pair.source_url,
                    pair.target_url,
                    result.error_message.as_deref().unwrap_or("unknown error")
                )
            };
            if result.success {
                run.record(message.clone());
            } else {
                run.record_warning(message.clone());
            }
            run.site_results.push(result.clone());

            if let Err(e) = self.store.save(&config.task_id, &run).await {
                warn!("Failed to save progress for task '{}': {e}", config.task_id);
            }
            emit(&on_progress, ProgressEvent::new(processed, total, message, Some(result)));
        }

        run.status = if cancelled {
            RunStatus::Cancelled
        } else if run.has_failures_among(&config.site_pairs) {
            RunStatus::Failed
        } else {
            RunStatus::Completed
        };
        run.completed_at_utc = Some(Utc::now());
        let closing = format!(
            "Task '{}' {} after {} of {} site pairs ({} throttled retries)",
            config.task_id,
            run.status.as_str().to_lowercase(),
            processed,
            total,
            run.throttle_retry_count
        );
        match run.status {
            RunStatus::Completed => run.record(closing),
            _ => run.record_warning(closing),
        }

        self.store.save(&config.task_id, &run).await?;
        Ok(run)
    }

    /// Compares one pair. Always yields a result; failures are recorded on it.
    ///
    /// An `AuthExpired` failure re-authenticates the failing tenant and reruns
    /// the pair once. It is final when that tenant's credential was already
    /// obtained from the callback for this pair.
    async fn compare_pair(
        &self,
        config: &ComparisonConfiguration,
        pair: &SiteComparePair,
        retry: &ThrottleRetryPolicy,
        reauthenticate: Option<&Reauthenticate>,
    ) -> SiteComparisonResult {
        let (mut credentials, refreshed) = match self.resolve_credentials(config, reauthenticate) {
            Ok(resolved) => resolved,
            Err(error) => return SiteComparisonResult::failed(pair, &error),
        };
        let mut reauthenticated = false;

        loop {
            let failure = match self.compare_isolated(config, pair, &credentials, retry).await {
                Ok(result) => return result,
                Err(failure) => failure,
            };
            // A credential the caller just handed over gets no second prompt
            if !failure.error.is_auth_expired()
                || reauthenticated
                || refreshed.contains(&failure.tenant_id)
            {
                return failure.partial;
            }

            reauthenticated = true;
            let tenant = failure.tenant_id.as_str();
            warn!("Credential for tenant '{tenant}' was rejected, re-authenticating");
            let Some(fresh) = self.reauthenticate(tenant, reauthenticate) else {
                let mut partial = failure.partial;
                partial.mark_failed(&PairError::Authentication {
                    tenant: tenant.to_string(),
                });
                return partial;
            };
            if tenant == config.source_connection_id {
                credentials.source = fresh.clone();
            }
            if tenant == config.target_connection_id {
                credentials.target = fresh;
            }
        }
    }

    /// Runs the comparer, turning a panic into a failure of this pair only.
    async fn compare_isolated(
        &self,
        config: &ComparisonConfiguration,
        pair: &SiteComparePair,
        credentials: &PairCredentials,
        retry: &ThrottleRetryPolicy,
    ) -> Result<SiteComparisonResult, PairFailure> {
        let comparer = PairComparer::new(self.client.as_ref(), self.cache.as_ref(), retry, config);
        match AssertUnwindSafe(comparer.compare(pair, credentials))
            .catch_unwind()
            .await
        {
            Ok(outcome) => outcome,
            Err(panic) => {
                let error = PairError::Unexpected(panic_message(panic.as_ref()));
                Err(PairFailure {
                    partial: SiteComparisonResult::failed(pair, &error),
                    error,
                    tenant_id: String::new(),
                })
            }
        }
    }

    /// Credentials for both tenants, plus the tenants whose credential came
    /// from the re-authentication callback.
    fn resolve_credentials(
        &self,
        config: &ComparisonConfiguration,
        reauthenticate: Option<&Reauthenticate>,
    ) -> Result<(PairCredentials, Vec<String>), PairError> {
        let mut refreshed = Vec::new();
        let mut resolve = |tenant: &str| -> Result<Credentials, PairError> {
            if let Some(credentials) = self.credentials.get(tenant).filter(|c| !c.is_expired()) {
                return Ok(credentials);
            }
            let fresh = self.reauthenticate(tenant, reauthenticate).ok_or_else(|| {
                PairError::Authentication {
                    tenant: tenant.to_string(),
                }
            })?;
            refreshed.push(tenant.to_string());
            Ok(fresh)
        };
        let credentials = PairCredentials {
            source: resolve(&config.source_connection_id)?,
            target: resolve(&config.target_connection_id)?,
        };
        Ok((credentials, refreshed))
    }

    /// Asks the caller for a fresh credential and stores it on success.
    fn reauthenticate(
        &self,
        tenant: &str,
        reauthenticate: Option<&Reauthenticate>,
    ) -> Option<Credentials> {
        let callback = reauthenticate?;
        debug!("Requesting credentials for tenant '{tenant}'");
        let credentials = callback(tenant)?;
        self.credentials.put(tenant, credentials.clone());
        Some(credentials)
    }
}

/// Configured pairs that a continued run will compare again.
fn pending_pairs(config: &ComparisonConfiguration, previous: &RunResult) -> Vec<SiteComparePair> {
    let completed = previous.completed_sites();
    config
        .site_pairs
        .iter()
        .filter(|pair| !completed.contains(&pair.resume_key()))
        .cloned()
        .collect()
}

fn emit(on_progress: &ProgressCallback, event: ProgressEvent) {
    if let Some(callback) = on_progress {
        callback(&event);
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "pair comparison panicked".to_string()
    }
}
