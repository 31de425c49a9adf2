//! Catalog snapshot cache.
//!
//! Maps `(tenant, site, library)` to the last catalog captured for it so a
//! rerun within [`SCAN_CACHE_MAX_AGE`](crate::config::SCAN_CACHE_MAX_AGE) does
//! not fetch unchanged libraries again.
//!
//! The cache is shared by every run in the process. Snapshots are immutable
//! once written; a newer capture replaces the entry atomically, so readers
//! see either the old or the new snapshot, never a mix.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::catalog::CatalogItem;

/// A library's items at a point in time.
#[derive(Debug, Clone)]
pub struct CatalogSnapshot {
    pub captured_at: DateTime<Utc>,
    pub items: Arc<Vec<CatalogItem>>,
}

impl CatalogSnapshot {
    pub fn new(items: Vec<CatalogItem>) -> Self {
        Self::captured_at(Utc::now(), items)
    }

    pub fn captured_at(captured_at: DateTime<Utc>, items: Vec<CatalogItem>) -> Self {
        Self {
            captured_at,
            items: Arc::new(items),
        }
    }

    /// Whether the snapshot is older than `max_age` at `now`.
    ///
    /// A capture time in the future (clock skew) counts as fresh.
    pub fn is_stale_at(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        match (now - self.captured_at).to_std() {
            Ok(age) => age > max_age,
            Err(_) => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    tenant_id: String,
    site: String,
    library_id: String,
}

impl CacheKey {
    fn new(tenant_id: &str, site_url: &str, library_id: &str) -> Self {
        Self {
            tenant_id: tenant_id.to_string(),
            site: crate::config::site_identity(site_url),
            library_id: library_id.to_string(),
        }
    }
}

/// Process-wide store of catalog snapshots.
#[derive(Debug, Default)]
pub struct ScanCache {
    entries: DashMap<CacheKey, CatalogSnapshot>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl ScanCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the snapshot for a library if one exists and is no older than `max_age`.
    pub fn get(
        &self,
        tenant_id: &str,
        site_url: &str,
        library_id: &str,
        max_age: Duration,
    ) -> Option<CatalogSnapshot> {
        let key = CacheKey::new(tenant_id, site_url, library_id);
        let now = Utc::now();
        let snapshot = self
            .entries
            .get(&key)
            .map(|entry| entry.value().clone())
            .filter(|snapshot| !snapshot.is_stale_at(now, max_age));

        if snapshot.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        snapshot
    }

    /// Stores a snapshot, replacing any previous one for the same library.
    pub fn put(&self, tenant_id: &str, site_url: &str, library_id: &str, snapshot: CatalogSnapshot) {
        self.entries
            .insert(CacheKey::new(tenant_id, site_url, library_id), snapshot);
    }

    /// Drops every snapshot older than `max_age`. Returns how many were removed.
    pub fn purge_stale(&self, max_age: Duration) -> usize {
        let now = Utc::now();
        let before = self.entries.len();
        self.entries
            .retain(|_, snapshot| !snapshot.is_stale_at(now, max_age));
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> usize {
        self.misses.load(Ordering::Relaxed)
    }
}
