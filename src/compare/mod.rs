//! Site pair comparison.
//!
//! [`PairComparer`] compares one source site with its target site:
//! 1. Enumerate libraries on both sides and drop the ones out of scope
//! 2. Match libraries across tenants by title
//! 3. Fetch (or reuse from the scan cache) each library's catalog on both sides
//! 4. Key items by normalized path and classify the union of keys
//! 5. Aggregate per-site totals
//!
//! Any failure stops the pair; libraries completed before the failure stay on
//! the returned partial result.

mod outcome;
mod result;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use log::{debug, info};

use crate::cache::{CatalogSnapshot, ScanCache};
use crate::catalog::{CatalogItem, Library, LibraryKind, RemoteCatalogClient};
use crate::config::{ComparisonConfiguration, SiteComparePair, ASPX_EXTENSION, SCAN_CACHE_MAX_AGE};
use crate::credentials::Credentials;
use crate::error_handling::{PairError, RemoteError};
use crate::normalize::comparison_key;
use crate::retry::ThrottleRetryPolicy;

pub use outcome::{has_size_issue, ComparisonItem, ComparisonOutcome};
pub use result::{LibraryComparison, OutcomeCounts, SiteComparisonResult};

/// Resolved credentials for both tenants of a pair.
#[derive(Debug, Clone)]
pub struct PairCredentials {
    pub source: Credentials,
    pub target: Credentials,
}

/// A pair that stopped on an error.
#[derive(Debug, Clone)]
pub struct PairFailure {
    /// Result marked unsuccessful, holding every library compared before the error
    pub partial: SiteComparisonResult,
    pub error: PairError,
    /// Tenant whose call failed
    pub tenant_id: String,
}

/// Which side of a pair a call is made against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Source,
    Target,
}

/// A remote failure tagged with the side it happened on.
#[derive(Debug)]
struct SideFailure {
    side: Side,
    error: RemoteError,
}

impl SideFailure {
    fn on(side: Side) -> impl FnOnce(RemoteError) -> Self {
        move |error| Self { side, error }
    }
}

/// Compares one site pair under a configuration.
pub struct PairComparer<'a> {
    client: &'a dyn RemoteCatalogClient,
    cache: &'a ScanCache,
    retry: &'a ThrottleRetryPolicy,
    config: &'a ComparisonConfiguration,
    /// Lowercase excluded titles, system libraries included
    excluded: BTreeSet<String>,
}

impl<'a> PairComparer<'a> {
    pub fn new(
        client: &'a dyn RemoteCatalogClient,
        cache: &'a ScanCache,
        retry: &'a ThrottleRetryPolicy,
        config: &'a ComparisonConfiguration,
    ) -> Self {
        Self {
            client,
            cache,
            retry,
            config,
            excluded: config.effective_excluded_libraries(),
        }
    }

    /// Compares `pair` and returns its result.
    ///
    /// # Errors
    ///
    /// Returns a [`PairFailure`] holding the partial result when a remote
    /// call fails after retries.
    pub async fn compare(
        &self,
        pair: &SiteComparePair,
        credentials: &PairCredentials,
    ) -> Result<SiteComparisonResult, PairFailure> {
        let mut result = SiteComparisonResult::new(pair);

        let outcome = self.compare_into(pair, credentials, &mut result).await;
        result.recompute_aggregates();

        match outcome {
            Ok(()) => {
                info!(
                    "Compared {} -> {}: {} items, {:.1}% complete",
                    pair.source_url,
                    pair.target_url,
                    result.items.len(),
                    result.completeness_percent()
                );
                Ok(result)
            }
            Err(SideFailure { side, error }) => {
                let error = PairError::from(error);
                result.mark_failed(&error);
                Err(PairFailure {
                    partial: result,
                    error,
                    tenant_id: self.tenant_id(side).to_string(),
                })
            }
        }
    }

    async fn compare_into(
        &self,
        pair: &SiteComparePair,
        credentials: &PairCredentials,
        result: &mut SiteComparisonResult,
    ) -> Result<(), SideFailure> {
        let (source_libraries, target_libraries) = tokio::try_join!(
            self.list_libraries(Side::Source, &pair.source_url, &credentials.source),
            self.list_libraries(Side::Target, &pair.target_url, &credentials.target),
        )?;

        for (title, (source, target)) in match_libraries(source_libraries, target_libraries) {
            let (source_items, target_items) = tokio::try_join!(
                self.fetch_optional(Side::Source, &pair.source_url, source.as_ref(), &credentials.source),
                self.fetch_optional(Side::Target, &pair.target_url, target.as_ref(), &credentials.target),
            )?;

            let (library, items) = compare_library(
                &title,
                source_items.as_deref().map(Vec::as_slice),
                target_items.as_deref().map(Vec::as_slice),
                self.config.use_normalization,
            );
            debug!(
                "Library '{}': {} source, {} target, {} compared",
                library.title,
                library.source_item_count,
                library.target_item_count,
                items.len()
            );
            result.push_library(library, items);
        }

        Ok(())
    }

    async fn list_libraries(
        &self,
        side: Side,
        site_url: &str,
        credentials: &Credentials,
    ) -> Result<Vec<Library>, SideFailure> {
        let libraries = self
            .retry
            .execute(&format!("list libraries of {site_url}"), || {
                self.client.list_libraries(site_url, credentials)
            })
            .await
            .map_err(SideFailure::on(side))?;

        let total = libraries.len();
        let in_scope: Vec<Library> = libraries
            .into_iter()
            .filter(|library| self.is_library_in_scope(library))
            .collect();
        debug!(
            "{:?} {}: {} of {} libraries in scope",
            side,
            site_url,
            in_scope.len(),
            total
        );
        Ok(in_scope)
    }

    fn is_library_in_scope(&self, library: &Library) -> bool {
        if self.excluded.contains(&library.title.trim().to_lowercase()) {
            return false;
        }
        if library.hidden && !self.config.include_hidden {
            return false;
        }
        if library.kind == LibraryKind::SitePages && !self.config.include_aspx_pages {
            return false;
        }
        true
    }

    async fn fetch_optional(
        &self,
        side: Side,
        site_url: &str,
        library: Option<&Library>,
        credentials: &Credentials,
    ) -> Result<Option<Arc<Vec<CatalogItem>>>, SideFailure> {
        match library {
            Some(library) => self
                .fetch_catalog(side, site_url, library, credentials)
                .await
                .map(Some),
            None => Ok(None),
        }
    }

    /// Fetches a library's items, from the scan cache when allowed.
    async fn fetch_catalog(
        &self,
        side: Side,
        site_url: &str,
        library: &Library,
        credentials: &Credentials,
    ) -> Result<Arc<Vec<CatalogItem>>, SideFailure> {
        let tenant_id = self.tenant_id(side);

        if self.config.use_cache {
            if let Some(snapshot) = self
                .cache
                .get(tenant_id, site_url, &library.id, SCAN_CACHE_MAX_AGE)
            {
                debug!(
                    "Using cached catalog for '{}' on {} (captured {})",
                    library.title, site_url, snapshot.captured_at
                );
                return Ok(self.scoped_items(snapshot.items));
            }
        }

        let items = self
            .retry
            .execute(&format!("list items of '{}' on {site_url}", library.title), || {
                self.client.list_items(site_url, &library.id, credentials)
            })
            .await
            .map_err(SideFailure::on(side))?;

        let snapshot = CatalogSnapshot::new(items);
        let items = Arc::clone(&snapshot.items);
        if self.config.use_cache {
            self.cache.put(tenant_id, site_url, &library.id, snapshot);
        }
        Ok(self.scoped_items(items))
    }

    fn tenant_id(&self, side: Side) -> &str {
        match side {
            Side::Source => &self.config.source_connection_id,
            Side::Target => &self.config.target_connection_id,
        }
    }

    /// Drops `.aspx` items unless pages are included.
    fn scoped_items(&self, items: Arc<Vec<CatalogItem>>) -> Arc<Vec<CatalogItem>> {
        if self.config.include_aspx_pages || !items.iter().any(is_page) {
            return items;
        }
        Arc::new(items.iter().filter(|item| !is_page(item)).cloned().collect())
    }
}

fn is_page(item: &CatalogItem) -> bool {
    item.relative_path.to_lowercase().ends_with(ASPX_EXTENSION)
}

/// Pairs libraries across tenants by case-insensitive title.
///
/// The display title is the source title when the library exists at the
/// source. Output is ordered by lowercase title.
fn match_libraries(
    source: Vec<Library>,
    target: Vec<Library>,
) -> Vec<(String, (Option<Library>, Option<Library>))> {
    let mut matched: BTreeMap<String, (String, Option<Library>, Option<Library>)> = BTreeMap::new();

    for library in source {
        let entry = matched
            .entry(library.title.trim().to_lowercase())
            .or_insert_with(|| (library.title.clone(), None, None));
        entry.1.get_or_insert(library);
    }
    for library in target {
        let entry = matched
            .entry(library.title.trim().to_lowercase())
            .or_insert_with(|| (library.title.clone(), None, None));
        entry.2.get_or_insert(library);
    }

    matched
        .into_values()
        .map(|(title, source, target)| (title, (source, target)))
        .collect()
}

/// Classifies every key of one library.
///
/// `None` means the library does not exist on that side, so every item on
/// the other side is one-sided. When two items on the same side share a key,
/// the first one reported wins.
pub fn compare_library(
    title: &str,
    source: Option<&[CatalogItem]>,
    target: Option<&[CatalogItem]>,
    use_normalization: bool,
) -> (LibraryComparison, Vec<ComparisonItem>) {
    let source_index = index_by_key(source.unwrap_or_default(), use_normalization);
    let target_index = index_by_key(target.unwrap_or_default(), use_normalization);

    let keys: BTreeSet<&str> = source_index
        .keys()
        .chain(target_index.keys())
        .map(String::as_str)
        .collect();

    let items: Vec<ComparisonItem> = keys
        .into_iter()
        .filter_map(|key| {
            ComparisonItem::classify(
                title,
                key,
                source_index.get(key).copied(),
                target_index.get(key).copied(),
            )
        })
        .collect();

    let mut counts = OutcomeCounts::default();
    for item in &items {
        counts.record(item);
    }

    let library = LibraryComparison {
        title: title.to_string(),
        present_at_source: source.is_some(),
        present_at_target: target.is_some(),
        source_item_count: source.map_or(0, |items| items.len() as u64),
        target_item_count: target.map_or(0, |items| items.len() as u64),
        counts,
    };
    (library, items)
}

fn index_by_key(items: &[CatalogItem], use_normalization: bool) -> HashMap<String, &CatalogItem> {
    let mut index = HashMap::with_capacity(items.len());
    for item in items {
        let key = comparison_key(&item.relative_path, use_normalization);
        if index.contains_key(&key) {
            debug!(
                "Duplicate comparison key '{}' for '{}', keeping first",
                key, item.relative_path
            );
            continue;
        }
        index.insert(key, item);
    }
    index
}
