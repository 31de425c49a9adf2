//! site_compare library: cross-tenant site comparison engine
//!
//! This library compares document libraries between a source tenant and the
//! target tenant they were migrated to. For every configured site pair it
//! walks both remote catalogs, matches items by (optionally normalized) path
//! and classifies each one as found, missing, extraneous, truncated or stale.
//! Runs are cancellable, survive re-authentication, and can be continued
//! after a failure without rescanning pairs that already succeeded.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use site_compare::{
//!     ComparisonConfiguration, ComparisonOrchestrator, Credentials, InMemoryCredentialStore,
//!     InMemoryResultStore, ScanCache, SiteComparePair, SnapshotCatalogClient, CredentialStore,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Arc::new(SnapshotCatalogClient::from_path("catalog.json".as_ref())?);
//! let credentials = Arc::new(InMemoryCredentialStore::new());
//! credentials.put("contoso", Credentials::new("token", None));
//! credentials.put("fabrikam", Credentials::new("token", None));
//!
//! let orchestrator = ComparisonOrchestrator::new(
//!     client,
//!     credentials,
//!     Arc::new(InMemoryResultStore::new()),
//!     Arc::new(ScanCache::new()),
//! );
//! let config = ComparisonConfiguration {
//!     task_id: "wave-1".to_string(),
//!     source_connection_id: "contoso".to_string(),
//!     target_connection_id: "fabrikam".to_string(),
//!     site_pairs: vec![SiteComparePair::new(
//!         "https://contoso.sharepoint.com/sites/hr",
//!         "https://fabrikam.sharepoint.com/sites/hr",
//!     )],
//!     ..Default::default()
//! };
//!
//! let run = orchestrator
//!     .run(&config, false, None, CancellationToken::new(), None)
//!     .await?;
//! println!("{}: {:.1}% complete", run.status, run.summary().completeness_percent);
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Use `#[tokio::main]` in your application
//! or ensure you're calling library functions within an async context.

pub mod aggregate;
pub mod cache;
pub mod catalog;
pub mod compare;
pub mod config;
pub mod credentials;
pub mod error_handling;
pub mod initialization;
pub mod normalize;
pub mod orchestrator;
pub mod pairs;
pub mod retry;
pub mod storage;

// Re-export public API
pub use aggregate::{aggregate, log_summary, Summary};
pub use cache::{CatalogSnapshot, ScanCache};
pub use catalog::{
    CatalogItem, Library, LibraryKind, RemoteCatalogClient, SnapshotCatalog, SnapshotCatalogClient,
    SnapshotLibrary, SnapshotSite,
};
pub use compare::{ComparisonItem, ComparisonOutcome, SiteComparisonResult};
pub use config::{ComparisonConfiguration, LogFormat, LogLevel, RetrySettings, SiteComparePair};
pub use credentials::{CredentialStore, Credentials, InMemoryCredentialStore};
pub use error_handling::{
    EngineError, PairError, PairImportError, RemoteError, RemoteErrorKind, StoreError,
    ValidationError,
};
pub use orchestrator::{
    ComparisonOrchestrator, ProgressCallback, ProgressEvent, Reauthenticate,
    ReauthenticateCallback, RunResult, RunStatus,
};
pub use storage::{InMemoryResultStore, SqliteResultStore, TaskResultStore};
