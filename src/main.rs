//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `site_compare` library that handles:
//! - Command-line argument parsing
//! - Environment variable loading (.env file)
//! - Logger initialization
//! - Ctrl-C as cooperative cancellation
//! - User-facing output formatting
//!
//! All core functionality is implemented in the library crate.

use std::process;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{debug, warn};
use tokio_util::sync::CancellationToken;

use site_compare::config::Opt;
use site_compare::initialization::{init_logger_with, init_result_store};
use site_compare::pairs::read_pairs_csv_path;
use site_compare::{
    log_summary, ComparisonConfiguration, ComparisonOrchestrator, CredentialStore, Credentials,
    InMemoryCredentialStore, ProgressCallback, ProgressEvent, RunStatus, ScanCache,
    SnapshotCatalogClient,
};

/// Exit status when the run finished but not every pair compared cleanly.
const EXIT_INCOMPLETE: i32 = 2;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file (if it exists)
    let _ = dotenvy::dotenv();

    let opt = Opt::parse();

    let log_level = opt.log_level.clone();
    let log_format = opt.log_format.clone();
    init_logger_with(log_level.into(), log_format).context("Failed to initialize logger")?;

    match run(opt).await {
        Ok(RunStatus::Completed) => Ok(()),
        Ok(_) => process::exit(EXIT_INCOMPLETE),
        Err(e) => {
            eprintln!("site_compare error: {:#}", e);
            process::exit(1);
        }
    }
}

async fn run(opt: Opt) -> Result<RunStatus> {
    let config = load_configuration(&opt)?;

    let client = SnapshotCatalogClient::from_path(&opt.catalog)
        .with_context(|| format!("Failed to load catalog snapshot {}", opt.catalog.display()))?;
    for pair in config.site_pairs.iter().filter(|pair| !client.covers(pair)) {
        warn!(
            "Catalog snapshot has no entry for {} or {}",
            pair.source_url, pair.target_url
        );
    }

    // Snapshot exports are read offline, so a non-expiring credential stands in for sign-in
    let credentials = Arc::new(InMemoryCredentialStore::new());
    for tenant in [&config.source_connection_id, &config.target_connection_id] {
        credentials.put(tenant, Credentials::new("snapshot", None));
    }

    let store = init_result_store(&opt.db)
        .await
        .with_context(|| format!("Failed to open result store {}", opt.db.display()))?;

    let orchestrator = ComparisonOrchestrator::new(
        Arc::new(client),
        credentials,
        store,
        Arc::new(ScanCache::new()),
    );

    let cancel = CancellationToken::new();
    let cancel_on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current site pair");
            cancel_on_signal.cancel();
        }
    });

    let on_progress: ProgressCallback = Some(Arc::new(|event: &ProgressEvent| {
        debug!("{}% complete", event.percent_complete);
    }));

    let result = orchestrator
        .run(
            &config,
            opt.continue_from_previous,
            on_progress,
            cancel,
            None,
        )
        .await
        .context("Comparison run failed")?;

    let summary = result.summary();
    log_summary(&summary);
    println!(
        "{} task '{}': {} site pair{} ({} failed), {:.1}% of source documents found - results saved in {}",
        result.status,
        result.task_id,
        summary.sites_processed,
        if summary.sites_processed == 1 { "" } else { "s" },
        summary.sites_failed,
        summary.completeness_percent,
        opt.db.display()
    );

    Ok(result.status)
}

/// Builds the task from `--task` or from `--pairs` and the tenant ids, then applies CLI switches.
fn load_configuration(opt: &Opt) -> Result<ComparisonConfiguration> {
    let mut config = if let Some(path) = &opt.task {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read task file {}", path.display()))?;
        serde_json::from_str::<ComparisonConfiguration>(&raw)
            .with_context(|| format!("Failed to parse task file {}", path.display()))?
    } else if let Some(path) = &opt.pairs {
        let site_pairs = read_pairs_csv_path(path)
            .with_context(|| format!("Failed to read site pairs from {}", path.display()))?;
        ComparisonConfiguration {
            task_id: opt.task_id.clone(),
            source_connection_id: opt.source_tenant.clone().unwrap_or_default(),
            target_connection_id: opt.target_tenant.clone().unwrap_or_default(),
            site_pairs,
            ..Default::default()
        }
    } else {
        bail!("Either --task or --pairs must be given");
    };

    opt.apply_overrides(&mut config);
    Ok(config)
}
