//! Result store schema.

use sqlx::{Pool, Sqlite};

use crate::error_handling::StoreError;

/// Applies the schema in `migrations/`, embedded at compile time.
pub async fn run_migrations(pool: &Pool<Sqlite>) -> Result<(), StoreError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
