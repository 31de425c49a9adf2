//! SQLite pool for the result store.
//!
//! The database file is created on first use and runs in WAL mode, so the
//! latest result can be read while a run is still saving to it.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};

use crate::config::{DB_BUSY_TIMEOUT_SECS, DB_MAX_CONNECTIONS};
use crate::error_handling::StoreError;

/// Opens a pool on the database file at `db_path`, creating the file if needed.
///
/// # Errors
///
/// `StoreError::FileCreationError` when the parent directory does not exist,
/// `StoreError::SqlError` when SQLite refuses the file.
pub async fn init_db_pool_with_path(db_path: &Path) -> Result<Arc<Pool<Sqlite>>, StoreError> {
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.is_dir() {
            error!("Result database directory {} does not exist", parent.display());
            return Err(StoreError::FileCreationError(format!(
                "directory {} does not exist",
                parent.display()
            )));
        }
    }

    let existed = db_path.exists();
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(DB_BUSY_TIMEOUT_SECS));

    let pool = SqlitePoolOptions::new()
        .max_connections(DB_MAX_CONNECTIONS)
        .connect_with(options)
        .await
        .map_err(|e| {
            error!("Failed to open result database {}: {e}", db_path.display());
            StoreError::SqlError(e)
        })?;

    debug!(
        "{} result database {}",
        if existed { "Opened" } else { "Created" },
        db_path.display()
    );
    Ok(Arc::new(pool))
}
