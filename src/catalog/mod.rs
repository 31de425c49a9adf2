//! Remote catalog access.
//!
//! The comparison engine reads sites exclusively through [`RemoteCatalogClient`].
//! The HTTP/CSOM implementation lives outside this crate; [`SnapshotCatalogClient`]
//! serves a catalog export from disk for offline comparisons and tests.

mod snapshot;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::credentials::Credentials;
use crate::error_handling::RemoteError;

pub use snapshot::{SnapshotCatalog, SnapshotCatalogClient, SnapshotLibrary, SnapshotSite};

/// What kind of container a library is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LibraryKind {
    DocumentLibrary,
    List,
    /// Site pages library (`.aspx` pages)
    SitePages,
}

/// A document library or list on a site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Library {
    /// Tenant-local identifier; differs between source and target
    pub id: String,
    pub title: String,
    pub kind: LibraryKind,
    #[serde(default)]
    pub hidden: bool,
}

/// One document or list item as reported by the remote side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    /// Path relative to the library root, as reported (used for display)
    pub relative_path: String,
    pub size_bytes: u64,
    pub version_count: u32,
    pub last_modified_utc: DateTime<Utc>,
}

/// Read access to a tenant's sites.
///
/// Implementations report rate limiting as `RemoteErrorKind::Throttled` and
/// rejected credentials as `RemoteErrorKind::AuthExpired`; the engine retries
/// the former and re-authenticates on the latter.
#[async_trait]
pub trait RemoteCatalogClient: Send + Sync {
    /// Lists the libraries and lists of a site.
    async fn list_libraries(
        &self,
        site_url: &str,
        credentials: &Credentials,
    ) -> Result<Vec<Library>, RemoteError>;

    /// Lists every item of one library, following pagination to the end.
    async fn list_items(
        &self,
        site_url: &str,
        library_id: &str,
        credentials: &Credentials,
    ) -> Result<Vec<CatalogItem>, RemoteError>;
}
