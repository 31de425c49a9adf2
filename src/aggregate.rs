//! Run-level statistics.
//!
//! [`aggregate`] is a pure reducer over site results. It is recomputed
//! whenever a summary is needed and never stored, so a persisted run always
//! yields the same summary as the live run did.

use log::{info, warn};
use serde::Serialize;
use strum::IntoEnumIterator;

use crate::compare::{ComparisonOutcome, OutcomeCounts, SiteComparisonResult};

/// Statistics over every site of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub sites_processed: usize,
    pub sites_failed: usize,
    pub counts: OutcomeCounts,
    pub total_source_documents: u64,
    pub total_target_documents: u64,
    pub total_source_size_bytes: u64,
    pub total_target_size_bytes: u64,
    /// Average version count per source document, across all sites
    pub avg_source_versions: f64,
    /// Average version count per target document, across all sites
    pub avg_target_versions: f64,
    pub completeness_percent: f64,
}

/// Computes run-level statistics from per-site results.
///
/// Version averages are weighted by each site's document count on that side,
/// not by site.
pub fn aggregate(site_results: &[SiteComparisonResult]) -> Summary {
    let mut counts = OutcomeCounts::default();
    let mut summary = Summary {
        sites_processed: site_results.len(),
        ..Summary::default()
    };
    let (mut source_version_total, mut target_version_total) = (0.0f64, 0.0f64);

    for site in site_results {
        if !site.success {
            summary.sites_failed += 1;
        }
        counts.add(&site.counts_by_outcome);
        summary.total_source_size_bytes = summary
            .total_source_size_bytes
            .saturating_add(site.total_source_size_bytes);
        summary.total_target_size_bytes = summary
            .total_target_size_bytes
            .saturating_add(site.total_target_size_bytes);
        source_version_total += site.avg_source_versions * site.source_document_count() as f64;
        target_version_total += site.avg_target_versions * site.target_document_count() as f64;
    }

    summary.total_source_documents = counts.source_documents();
    summary.total_target_documents = counts.target_documents();
    summary.avg_source_versions = weighted(source_version_total, summary.total_source_documents);
    summary.avg_target_versions = weighted(target_version_total, summary.total_target_documents);
    summary.completeness_percent = counts.completeness_percent();
    summary.counts = counts;
    summary
}

fn weighted(total: f64, count: u64) -> f64 {
    if count == 0 {
        0.0
    } else {
        total / count as f64
    }
}

/// Logs a run summary.
pub fn log_summary(summary: &Summary) {
    info!(
        "Sites: {} processed, {} failed",
        summary.sites_processed, summary.sites_failed
    );
    for outcome in ComparisonOutcome::iter() {
        let count = summary.counts.get(outcome);
        if count > 0 {
            info!("   {}: {}", outcome, count);
        }
    }
    info!(
        "Documents: {} source / {} target, {:.1}% complete",
        summary.total_source_documents,
        summary.total_target_documents,
        summary.completeness_percent
    );
    info!(
        "Size: {} bytes source / {} bytes target; avg versions {:.2} / {:.2}",
        summary.total_source_size_bytes,
        summary.total_target_size_bytes,
        summary.avg_source_versions,
        summary.avg_target_versions
    );
    if summary.sites_failed > 0 {
        warn!(
            "{} site pair(s) failed; rerun with --continue to retry them",
            summary.sites_failed
        );
    }
}
