// Shared test helpers: a scriptable in-process catalog client and fixtures.
//
// This module is included with `mod helpers;` by the integration test files.

#![allow(dead_code)] // Each test file uses a different subset

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use site_compare::{
    CatalogItem, ComparisonConfiguration, ComparisonOrchestrator, CredentialStore, Credentials,
    InMemoryCredentialStore, InMemoryResultStore, Library, LibraryKind, RemoteCatalogClient,
    RemoteError, RetrySettings, ScanCache, SiteComparePair, SnapshotCatalog, SnapshotCatalogClient,
    SnapshotLibrary, SnapshotSite,
};

pub const SOURCE_TENANT: &str = "contoso";
pub const TARGET_TENANT: &str = "fabrikam";

pub fn source_url(site: &str) -> String {
    format!("https://contoso.sharepoint.com/sites/{site}")
}

pub fn target_url(site: &str) -> String {
    format!("https://fabrikam.sharepoint.com/sites/{site}")
}

pub fn pair(site: &str) -> SiteComparePair {
    SiteComparePair::new(source_url(site), target_url(site))
}

/// A catalog item modified on the given day of March 2024.
pub fn item(path: &str, size_bytes: u64, version_count: u32, day: u32) -> CatalogItem {
    CatalogItem {
        relative_path: path.to_string(),
        size_bytes,
        version_count,
        last_modified_utc: Utc.with_ymd_and_hms(2024, 3, day, 9, 0, 0).unwrap(),
    }
}

pub fn library(id: &str, title: &str, items: Vec<CatalogItem>) -> SnapshotLibrary {
    SnapshotLibrary {
        id: id.to_string(),
        title: title.to_string(),
        kind: LibraryKind::DocumentLibrary,
        hidden: false,
        items,
    }
}

pub fn config(task_id: &str, pairs: Vec<SiteComparePair>) -> ComparisonConfiguration {
    ComparisonConfiguration {
        task_id: task_id.to_string(),
        source_connection_id: SOURCE_TENANT.to_string(),
        target_connection_id: TARGET_TENANT.to_string(),
        site_pairs: pairs,
        ..Default::default()
    }
}

pub fn fast_retry(max_retries: usize) -> RetrySettings {
    RetrySettings {
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
        max_retries,
    }
}

fn site_key(url: &str) -> String {
    url.trim().trim_end_matches('/').to_lowercase()
}

/// Catalog client over in-memory sites with scripted faults.
///
/// Faults are consumed in order, per site URL on `list_libraries` calls and
/// per site and library on `list_items` calls.
#[derive(Default)]
pub struct ScriptedCatalogClient {
    catalog: SnapshotCatalog,
    inner: SnapshotCatalogClient,
    faults: Mutex<HashMap<String, VecDeque<RemoteError>>>,
    item_faults: Mutex<HashMap<(String, String), VecDeque<RemoteError>>>,
    panicking_sites: Mutex<HashSet<String>>,
    rejected_tokens: Mutex<HashSet<String>>,
    library_calls: Mutex<HashMap<String, usize>>,
    item_calls: AtomicUsize,
}

impl ScriptedCatalogClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a site to the catalog, replacing any previous definition.
    pub fn with_site(mut self, url: &str, libraries: Vec<SnapshotLibrary>) -> Self {
        self.catalog
            .sites
            .insert(url.to_string(), SnapshotSite { libraries });
        self.inner = SnapshotCatalogClient::new(self.catalog.clone());
        self
    }

    /// Adds source and target sites for `site` with the given libraries.
    pub fn with_pair(self, site: &str, source: Vec<SnapshotLibrary>, target: Vec<SnapshotLibrary>) -> Self {
        self.with_site(&source_url(site), source)
            .with_site(&target_url(site), target)
    }

    /// Queues a fault returned by the next `list_libraries` call for `url`.
    pub fn fail_next(&self, url: &str, error: RemoteError) {
        self.faults
            .lock()
            .unwrap()
            .entry(site_key(url))
            .or_default()
            .push_back(error);
    }

    /// Queues a fault returned by the next `list_items` call for one library.
    pub fn fail_items_next(&self, url: &str, library_id: &str, error: RemoteError) {
        self.item_faults
            .lock()
            .unwrap()
            .entry((site_key(url), library_id.to_string()))
            .or_default()
            .push_back(error);
    }

    /// Makes every `list_libraries` call for `url` panic.
    pub fn panic_on(&self, url: &str) {
        self.panicking_sites.lock().unwrap().insert(site_key(url));
    }

    /// Makes every call presenting `token` fail with `AuthExpired`.
    pub fn reject_token(&self, token: &str) {
        self.rejected_tokens.lock().unwrap().insert(token.to_string());
    }

    pub fn library_calls(&self, url: &str) -> usize {
        self.library_calls
            .lock()
            .unwrap()
            .get(&site_key(url))
            .copied()
            .unwrap_or(0)
    }

    pub fn item_calls(&self) -> usize {
        self.item_calls.load(Ordering::SeqCst)
    }

    fn check_token(&self, credentials: &Credentials) -> Result<(), RemoteError> {
        if self
            .rejected_tokens
            .lock()
            .unwrap()
            .contains(&credentials.access_token)
        {
            return Err(RemoteError::auth_expired("Access token rejected"));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteCatalogClient for ScriptedCatalogClient {
    async fn list_libraries(
        &self,
        site_url: &str,
        credentials: &Credentials,
    ) -> Result<Vec<Library>, RemoteError> {
        let key = site_key(site_url);
        *self.library_calls.lock().unwrap().entry(key.clone()).or_default() += 1;

        if self.panicking_sites.lock().unwrap().contains(&key) {
            panic!("scripted panic for {site_url}");
        }
        let fault = self
            .faults
            .lock()
            .unwrap()
            .get_mut(&key)
            .and_then(VecDeque::pop_front);
        if let Some(error) = fault {
            return Err(error);
        }
        self.check_token(credentials)?;
        self.inner.list_libraries(site_url, credentials).await
    }

    async fn list_items(
        &self,
        site_url: &str,
        library_id: &str,
        credentials: &Credentials,
    ) -> Result<Vec<CatalogItem>, RemoteError> {
        self.item_calls.fetch_add(1, Ordering::SeqCst);
        let fault = self
            .item_faults
            .lock()
            .unwrap()
            .get_mut(&(site_key(site_url), library_id.to_string()))
            .and_then(VecDeque::pop_front);
        if let Some(error) = fault {
            return Err(error);
        }
        self.check_token(credentials)?;
        self.inner.list_items(site_url, library_id, credentials).await
    }
}

/// Everything a test needs to drive runs against one client.
pub struct Harness {
    pub client: Arc<ScriptedCatalogClient>,
    pub credentials: Arc<InMemoryCredentialStore>,
    pub store: Arc<InMemoryResultStore>,
    pub cache: Arc<ScanCache>,
}

impl Harness {
    /// A harness whose tenants both hold a valid, non-expiring credential.
    pub fn new(client: ScriptedCatalogClient) -> Self {
        let credentials = Arc::new(InMemoryCredentialStore::new());
        credentials.put(SOURCE_TENANT, Credentials::new("token", None));
        credentials.put(TARGET_TENANT, Credentials::new("token", None));
        Self {
            client: Arc::new(client),
            credentials,
            store: Arc::new(InMemoryResultStore::new()),
            cache: Arc::new(ScanCache::new()),
        }
    }

    pub fn orchestrator(&self) -> ComparisonOrchestrator {
        self.orchestrator_with_retries(3)
    }

    pub fn orchestrator_with_retries(&self, max_retries: usize) -> ComparisonOrchestrator {
        ComparisonOrchestrator::new(
            self.client.clone(),
            self.credentials.clone(),
            self.store.clone(),
            self.cache.clone(),
        )
        .with_retry_settings(fast_retry(max_retries))
    }
}
