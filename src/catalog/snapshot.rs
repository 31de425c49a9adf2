//! Catalog client backed by a JSON export.
//!
//! The export maps site URLs to their libraries and items:
//!
//! ```json
//! {
//!   "sites": {
//!     "https://contoso.sharepoint.com/sites/hr": {
//!       "libraries": [
//!         {
//!           "id": "6f1c...",
//!           "title": "Documents",
//!           "kind": "documentLibrary",
//!           "items": [
//!             {
//!               "relativePath": "Policies/Leave.docx",
//!               "sizeBytes": 20480,
//!               "versionCount": 3,
//!               "lastModifiedUtc": "2024-03-01T10:00:00Z"
//!             }
//!           ]
//!         }
//!       ]
//!     }
//!   }
//! }
//! ```

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{CatalogItem, Library, LibraryKind, RemoteCatalogClient};
use crate::config::SiteComparePair;
use crate::credentials::Credentials;
use crate::error_handling::RemoteError;

/// A library and its items in a catalog export.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotLibrary {
    pub id: String,
    pub title: String,
    pub kind: LibraryKind,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub items: Vec<CatalogItem>,
}

impl SnapshotLibrary {
    fn library(&self) -> Library {
        Library {
            id: self.id.clone(),
            title: self.title.clone(),
            kind: self.kind,
            hidden: self.hidden,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotSite {
    #[serde(default)]
    pub libraries: Vec<SnapshotLibrary>,
}

/// Deserialized catalog export.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotCatalog {
    #[serde(default)]
    pub sites: HashMap<String, SnapshotSite>,
}

/// Serves sites from a [`SnapshotCatalog`].
///
/// Site URLs are matched case-insensitively, ignoring a trailing slash.
/// Credentials are accepted as long as they are not expired.
#[derive(Debug, Clone, Default)]
pub struct SnapshotCatalogClient {
    sites: HashMap<String, SnapshotSite>,
}

impl SnapshotCatalogClient {
    pub fn new(catalog: SnapshotCatalog) -> Self {
        let sites = catalog
            .sites
            .into_iter()
            .map(|(url, site)| (crate::config::site_identity(&url), site))
            .collect();
        Self { sites }
    }

    /// Loads a catalog export from a JSON file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog export {}", path.display()))?;
        let catalog: SnapshotCatalog =
            serde_json::from_str(&content).context("Failed to parse catalog export")?;
        Ok(Self::new(catalog))
    }

    /// Whether both sides of a pair are present in the export.
    pub fn covers(&self, pair: &SiteComparePair) -> bool {
        self.site(&pair.source_url).is_some() && self.site(&pair.target_url).is_some()
    }

    fn site(&self, site_url: &str) -> Option<&SnapshotSite> {
        self.sites.get(&crate::config::site_identity(site_url))
    }

    fn authorized_site(
        &self,
        site_url: &str,
        credentials: &Credentials,
    ) -> Result<&SnapshotSite, RemoteError> {
        if credentials.is_expired() {
            return Err(RemoteError::auth_expired(format!(
                "Credential rejected for {site_url}"
            )));
        }
        self.site(site_url)
            .ok_or_else(|| RemoteError::not_found(format!("Site {site_url} is not in the export")))
    }
}

#[async_trait]
impl RemoteCatalogClient for SnapshotCatalogClient {
    async fn list_libraries(
        &self,
        site_url: &str,
        credentials: &Credentials,
    ) -> Result<Vec<Library>, RemoteError> {
        let site = self.authorized_site(site_url, credentials)?;
        Ok(site.libraries.iter().map(SnapshotLibrary::library).collect())
    }

    async fn list_items(
        &self,
        site_url: &str,
        library_id: &str,
        credentials: &Credentials,
    ) -> Result<Vec<CatalogItem>, RemoteError> {
        let site = self.authorized_site(site_url, credentials)?;
        site.libraries
            .iter()
            .find(|library| library.id == library_id)
            .map(|library| library.items.clone())
            .ok_or_else(|| {
                RemoteError::not_found(format!("Library {library_id} not found on {site_url}"))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_handling::RemoteErrorKind;

    const EXPORT: &str = r#"{
        "sites": {
            "https://contoso.sharepoint.com/sites/HR/": {
                "libraries": [
                    {
                        "id": "lib-1",
                        "title": "Documents",
                        "kind": "documentLibrary",
                        "items": [
                            {
                                "relativePath": "Policies/Leave.docx",
                                "sizeBytes": 20480,
                                "versionCount": 3,
                                "lastModifiedUtc": "2024-03-01T10:00:00Z"
                            }
                        ]
                    },
                    { "id": "lib-2", "title": "Site Pages", "kind": "sitePages", "hidden": true }
                ]
            }
        }
    }"#;

    fn client() -> SnapshotCatalogClient {
        SnapshotCatalogClient::new(serde_json::from_str(EXPORT).unwrap())
    }

    fn token() -> Credentials {
        Credentials::new("token", None)
    }

    #[tokio::test]
    async fn test_lists_libraries_with_normalized_site_url() {
        let libraries = client()
            .list_libraries("https://contoso.sharepoint.com/sites/hr", &token())
            .await
            .unwrap();
        assert_eq!(libraries.len(), 2);
        assert_eq!(libraries[1].kind, LibraryKind::SitePages);
        assert!(libraries[1].hidden);
    }

    #[tokio::test]
    async fn test_lists_items() {
        let items = client()
            .list_items("https://contoso.sharepoint.com/sites/hr", "lib-1", &token())
            .await
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].relative_path, "Policies/Leave.docx");
        assert_eq!(items[0].version_count, 3);
    }

    #[tokio::test]
    async fn test_unknown_site_is_not_found() {
        let err = client()
            .list_libraries("https://contoso.sharepoint.com/sites/finance", &token())
            .await
            .unwrap_err();
        assert_eq!(err.kind, RemoteErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_expired_credentials_are_rejected() {
        let expired = Credentials::new("", None);
        let err = client()
            .list_libraries("https://contoso.sharepoint.com/sites/hr", &expired)
            .await
            .unwrap_err();
        assert!(err.is_auth_expired());
    }

    #[test]
    fn test_from_path_reports_missing_file() {
        let err = SnapshotCatalogClient::from_path(Path::new("/nonexistent/export.json"))
            .unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to read catalog export"));
    }
}
