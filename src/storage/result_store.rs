//! Task result stores.
//!
//! A store keeps the latest [`RunResult`] per task id. Saving a result for a
//! task replaces whatever was stored for it before.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use sqlx::{Pool, Row, Sqlite};

use crate::error_handling::StoreError;
use crate::orchestrator::RunResult;

/// Persistence for run results, keyed by task id.
#[async_trait]
pub trait TaskResultStore: Send + Sync {
    /// Stores `result` as the latest result for `task_id`.
    async fn save(&self, task_id: &str, result: &RunResult) -> Result<(), StoreError>;

    /// Loads the latest result for `task_id`, if one was ever saved.
    async fn load_latest(&self, task_id: &str) -> Result<Option<RunResult>, StoreError>;
}

/// Process-local store, used by tests and embedders that persist elsewhere.
#[derive(Debug, Default)]
pub struct InMemoryResultStore {
    results: DashMap<String, RunResult>,
    saves: AtomicUsize,
}

impl InMemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `save` calls so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Whether anything was ever saved for `task_id`.
    pub fn contains(&self, task_id: &str) -> bool {
        self.results.contains_key(task_id)
    }
}

#[async_trait]
impl TaskResultStore for InMemoryResultStore {
    async fn save(&self, task_id: &str, result: &RunResult) -> Result<(), StoreError> {
        self.results.insert(task_id.to_string(), result.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn load_latest(&self, task_id: &str) -> Result<Option<RunResult>, StoreError> {
        Ok(self.results.get(task_id).map(|entry| entry.value().clone()))
    }
}

/// SQLite-backed store; the full result is kept as a JSON payload next to
/// a few queryable columns.
#[derive(Debug, Clone)]
pub struct SqliteResultStore {
    pool: Arc<Pool<Sqlite>>,
}

impl SqliteResultStore {
    /// Wraps a pool whose schema has already been migrated.
    pub fn new(pool: Arc<Pool<Sqlite>>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskResultStore for SqliteResultStore {
    async fn save(&self, task_id: &str, result: &RunResult) -> Result<(), StoreError> {
        let payload = serde_json::to_string(result)?;
        let pairs_failed = result
            .site_results
            .iter()
            .filter(|site| !site.success)
            .count() as i64;

        sqlx::query(
            "INSERT INTO task_results (task_id, status, executed_at_ms, completed_at_ms, pairs_total, pairs_failed, payload)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(task_id) DO UPDATE SET
                 status=excluded.status,
                 executed_at_ms=excluded.executed_at_ms,
                 completed_at_ms=excluded.completed_at_ms,
                 pairs_total=excluded.pairs_total,
                 pairs_failed=excluded.pairs_failed,
                 payload=excluded.payload",
        )
        .bind(task_id)
        .bind(result.status.as_str())
        .bind(result.executed_at_utc.timestamp_millis())
        .bind(result.completed_at_utc.map(|t| t.timestamp_millis()))
        .bind(result.site_results.len() as i64)
        .bind(pairs_failed)
        .bind(payload)
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn load_latest(&self, task_id: &str) -> Result<Option<RunResult>, StoreError> {
        let row = sqlx::query("SELECT payload FROM task_results WHERE task_id = ?")
            .bind(task_id)
            .fetch_optional(self.pool.as_ref())
            .await?;

        match row {
            Some(row) => {
                let payload: String = row.try_get("payload")?;
                Ok(Some(serde_json::from_str(&payload)?))
            }
            None => Ok(None),
        }
    }
}
