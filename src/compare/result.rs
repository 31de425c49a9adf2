//! Per-site comparison results and their aggregates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::outcome::{ComparisonItem, ComparisonOutcome};
use crate::config::SiteComparePair;
use crate::error_handling::{stored_error_message, PairError};

/// Item tallies by outcome.
///
/// `found` includes items that also count under `size_issue` or
/// `newer_at_source`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeCounts {
    pub found: u64,
    pub size_issue: u64,
    pub source_only: u64,
    pub target_only: u64,
    pub newer_at_source: u64,
}

impl OutcomeCounts {
    pub fn record(&mut self, item: &ComparisonItem) {
        for outcome in item.outcomes() {
            *self.slot(outcome) += 1;
        }
    }

    pub fn add(&mut self, other: &OutcomeCounts) {
        self.found += other.found;
        self.size_issue += other.size_issue;
        self.source_only += other.source_only;
        self.target_only += other.target_only;
        self.newer_at_source += other.newer_at_source;
    }

    pub fn get(&self, outcome: ComparisonOutcome) -> u64 {
        match outcome {
            ComparisonOutcome::Found => self.found,
            ComparisonOutcome::SizeIssue => self.size_issue,
            ComparisonOutcome::SourceOnly => self.source_only,
            ComparisonOutcome::TargetOnly => self.target_only,
            ComparisonOutcome::NewerAtSource => self.newer_at_source,
        }
    }

    fn slot(&mut self, outcome: ComparisonOutcome) -> &mut u64 {
        match outcome {
            ComparisonOutcome::Found => &mut self.found,
            ComparisonOutcome::SizeIssue => &mut self.size_issue,
            ComparisonOutcome::SourceOnly => &mut self.source_only,
            ComparisonOutcome::TargetOnly => &mut self.target_only,
            ComparisonOutcome::NewerAtSource => &mut self.newer_at_source,
        }
    }

    /// Documents present at the source.
    pub fn source_documents(&self) -> u64 {
        self.found + self.source_only
    }

    /// Documents present at the target.
    pub fn target_documents(&self) -> u64 {
        self.found + self.target_only
    }

    /// Percentage of source documents found at the target; 100 when there are none.
    pub fn completeness_percent(&self) -> f64 {
        let denominator = self.found + self.source_only;
        if denominator == 0 {
            100.0
        } else {
            self.found as f64 / denominator as f64 * 100.0
        }
    }
}

/// Item counts for one library, matched across tenants by title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryComparison {
    pub title: String,
    pub present_at_source: bool,
    pub present_at_target: bool,
    pub source_item_count: u64,
    pub target_item_count: u64,
    pub counts: OutcomeCounts,
}

/// Comparison of one site pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteComparisonResult {
    pub source_url: String,
    pub target_url: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub compared_at_utc: DateTime<Utc>,
    pub items: Vec<ComparisonItem>,
    #[serde(default)]
    pub libraries: Vec<LibraryComparison>,
    pub counts_by_outcome: OutcomeCounts,
    pub total_source_size_bytes: u64,
    pub total_target_size_bytes: u64,
    pub avg_source_versions: f64,
    pub avg_target_versions: f64,
}

impl SiteComparisonResult {
    /// An empty, successful result for a pair.
    pub fn new(pair: &SiteComparePair) -> Self {
        Self {
            source_url: pair.source_url.clone(),
            target_url: pair.target_url.clone(),
            success: true,
            error_message: None,
            compared_at_utc: Utc::now(),
            items: Vec::new(),
            libraries: Vec::new(),
            counts_by_outcome: OutcomeCounts::default(),
            total_source_size_bytes: 0,
            total_target_size_bytes: 0,
            avg_source_versions: 0.0,
            avg_target_versions: 0.0,
        }
    }

    /// A failed result carrying no items.
    pub fn failed(pair: &SiteComparePair, error: &PairError) -> Self {
        let mut result = Self::new(pair);
        result.mark_failed(error);
        result
    }

    pub fn mark_failed(&mut self, error: &PairError) {
        self.success = false;
        self.error_message = Some(stored_error_message(&error.to_string()));
    }

    /// Appends one library's classified items.
    pub fn push_library(&mut self, library: LibraryComparison, items: Vec<ComparisonItem>) {
        self.libraries.push(library);
        self.items.extend(items);
    }

    /// Recomputes counts, size totals and version averages from `items`.
    ///
    /// Averages only divide by items present on that side, so a one-sided
    /// item never lowers the other side's average.
    pub fn recompute_aggregates(&mut self) {
        let mut counts = OutcomeCounts::default();
        let (mut source_size, mut target_size) = (0u64, 0u64);
        let (mut source_versions, mut target_versions) = (0u64, 0u64);
        let (mut source_present, mut target_present) = (0u64, 0u64);

        for item in &self.items {
            counts.record(item);
            if let Some(source) = &item.source {
                source_size = source_size.saturating_add(source.size_bytes);
                source_versions += u64::from(source.version_count);
                source_present += 1;
            }
            if let Some(target) = &item.target {
                target_size = target_size.saturating_add(target.size_bytes);
                target_versions += u64::from(target.version_count);
                target_present += 1;
            }
        }

        self.counts_by_outcome = counts;
        self.total_source_size_bytes = source_size;
        self.total_target_size_bytes = target_size;
        self.avg_source_versions = average(source_versions, source_present);
        self.avg_target_versions = average(target_versions, target_present);
    }

    pub fn source_document_count(&self) -> u64 {
        self.counts_by_outcome.source_documents()
    }

    pub fn target_document_count(&self) -> u64 {
        self.counts_by_outcome.target_documents()
    }

    pub fn completeness_percent(&self) -> f64 {
        self.counts_by_outcome.completeness_percent()
    }

    /// Items tallied under `outcome`.
    pub fn items_with(&self, outcome: ComparisonOutcome) -> impl Iterator<Item = &ComparisonItem> {
        self.items
            .iter()
            .filter(move |item| item.outcomes().any(|o| o == outcome))
    }
}

fn average(total: u64, count: u64) -> f64 {
    if count == 0 {
        0.0
    } else {
        total as f64 / count as f64
    }
}
