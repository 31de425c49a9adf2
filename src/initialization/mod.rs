//! Application initialization and resource setup.
//!
//! This module provides functions to initialize the shared resources a
//! comparison run needs outside the engine itself:
//! - Logger (plain or JSON output)
//! - SQLite result store (with schema migrations applied)

mod logger;

use std::path::Path;
use std::sync::Arc;

use crate::error_handling::StoreError;
use crate::storage::SqliteResultStore;

// Re-export public API
pub use logger::init_logger_with;

/// Opens the SQLite result store at `db_path`, creating the file and schema if needed.
///
/// # Errors
///
/// Returns a `StoreError` if the file cannot be created, the connection fails,
/// or the migrations cannot be applied.
pub async fn init_result_store(db_path: &Path) -> Result<Arc<SqliteResultStore>, StoreError> {
    let pool = crate::storage::init_db_pool_with_path(db_path).await?;
    crate::storage::run_migrations(&pool).await?;
    Ok(Arc::new(SqliteResultStore::new(pool)))
}
