//! SqliteTaskStore - SQLite に永続化する正本
//!
//! One row per pending task, keyed by `TaskKey`. Inserts and deletes touch a
//! single row, so several processes can share one database file (the CLI
//! enqueues while `courier run` fires) without overwriting each other.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use tracing::debug;

use crate::domain::{ScheduledTask, TaskKey};
use crate::ports::{StoreError, TaskStore};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Durable store backed by a SQLite database.
#[derive(Debug, Clone)]
pub struct SqliteTaskStore {
    pool: SqlitePool,
}

impl SqliteTaskStore {
    /// Open the database at `path`, creating it (and its parent directory) if missing.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.run_migrations().await?;
        debug!(path = %path.display(), "opened task store");
        Ok(store)
    }

    /// Private in-memory database; gone once the store is dropped.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new().in_memory(true);
        // Every connection would get its own empty database, so pin one.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        let schema = include_str!("../../migrations/001_pending_tasks.sql");
        sqlx::raw_sql(schema).execute(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl TaskStore for SqliteTaskStore {
    async fn list_pending(&self) -> Result<Vec<ScheduledTask>, StoreError> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT record FROM pending_tasks ORDER BY scheduled_at, key")
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter()
            .map(|(record,)| serde_json::from_str(&record).map_err(StoreError::from))
            .collect()
    }

    async fn insert(&self, task: ScheduledTask) -> Result<(), StoreError> {
        let record = serde_json::to_string(&task)?;
        let result = sqlx::query(
            r#"
            INSERT INTO pending_tasks (key, scheduled_at, record)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(task.key().as_str())
        .bind(task.scheduled_at().timestamp_millis())
        .bind(record)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(StoreError::DuplicateKey(task.key().clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, key: &TaskKey) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM pending_tasks WHERE key = ?")
            .bind(key.as_str())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            debug!(task_key = %key, "delete of absent task");
        }
        Ok(())
    }
}
