//! Per-item comparison outcomes and classification.

use serde::{Deserialize, Serialize};
use strum_macros::EnumIter as EnumIterMacro;

use crate::catalog::CatalogItem;
use crate::config::SIZE_ISSUE_PERCENT;

/// How an item compares between source and target.
///
/// `Found`, `SourceOnly` and `TargetOnly` are mutually exclusive presence
/// states. `SizeIssue` and `NewerAtSource` are additional facts that only
/// apply to `Found` items and are tallied alongside `Found`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIterMacro)]
#[serde(rename_all = "camelCase")]
pub enum ComparisonOutcome {
    /// Present on both sides
    Found,
    /// Present on both sides, target empty or under 30% of the source size
    SizeIssue,
    /// Only at the source: migration missed or failed
    SourceOnly,
    /// Only at the target: extraneous content
    TargetOnly,
    /// Present on both sides, source modified after the target copy
    NewerAtSource,
}

impl ComparisonOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonOutcome::Found => "Found",
            ComparisonOutcome::SizeIssue => "Size issue",
            ComparisonOutcome::SourceOnly => "Source only",
            ComparisonOutcome::TargetOnly => "Target only",
            ComparisonOutcome::NewerAtSource => "Newer at source",
        }
    }
}

impl std::fmt::Display for ComparisonOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One matched comparison key within a library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonItem {
    /// Library title (source title when present on both sides)
    pub library: String,
    /// Comparison key the two sides were matched on
    pub key: String,
    /// Presence: `Found`, `SourceOnly` or `TargetOnly`
    pub status: ComparisonOutcome,
    pub size_issue: bool,
    pub newer_at_source: bool,
    pub source: Option<CatalogItem>,
    pub target: Option<CatalogItem>,
}

impl ComparisonItem {
    /// Classifies a key from the items found for it on each side.
    ///
    /// Returns `None` when neither side has the key.
    pub fn classify(
        library: &str,
        key: &str,
        source: Option<&CatalogItem>,
        target: Option<&CatalogItem>,
    ) -> Option<Self> {
        let (status, size_issue, newer_at_source) = match (source, target) {
            (Some(s), Some(t)) => (
                ComparisonOutcome::Found,
                has_size_issue(s.size_bytes, t.size_bytes),
                s.last_modified_utc > t.last_modified_utc,
            ),
            (Some(_), None) => (ComparisonOutcome::SourceOnly, false, false),
            (None, Some(_)) => (ComparisonOutcome::TargetOnly, false, false),
            (None, None) => return None,
        };

        Some(Self {
            library: library.to_string(),
            key: key.to_string(),
            status,
            size_issue,
            newer_at_source,
            source: source.cloned(),
            target: target.cloned(),
        })
    }

    /// Every outcome this item is tallied under.
    pub fn outcomes(&self) -> impl Iterator<Item = ComparisonOutcome> {
        [
            Some(self.status),
            self.size_issue.then_some(ComparisonOutcome::SizeIssue),
            self.newer_at_source
                .then_some(ComparisonOutcome::NewerAtSource),
        ]
        .into_iter()
        .flatten()
    }

    /// Path to show for this item, preferring the source's literal path.
    pub fn display_path(&self) -> &str {
        self.source
            .as_ref()
            .or(self.target.as_ref())
            .map_or(self.key.as_str(), |item| item.relative_path.as_str())
    }
}

/// Whether a target copy is suspiciously small compared to its source.
///
/// True when the source has content and the target is empty or strictly
/// below [`SIZE_ISSUE_PERCENT`] of the source size.
pub fn has_size_issue(source_bytes: u64, target_bytes: u64) -> bool {
    if source_bytes == 0 {
        return false;
    }
    target_bytes == 0
        || u128::from(target_bytes) * 100 < u128::from(source_bytes) * u128::from(SIZE_ISSUE_PERCENT)
}
