//! TaskStore port - 保留中タスクの正本（source of truth）
//!
//! The store is consulted only twice in a task's life:
//! - at startup, to rebuild the in-memory queue (`list_pending`)
//! - at termination, to forget the task once it fired or was cancelled (`delete`)
//!
//! Everything in between is served from memory.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{ScheduledTask, TaskKey};

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend could not be reached or refused the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A record with the same key is already stored.
    #[error("duplicate key: {0}")]
    DuplicateKey(TaskKey),

    /// The database rejected a query or could not be opened.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Preparing the database location failed.
    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Storage lock was poisoned.
    #[error("store lock poisoned")]
    LockPoisoned,
}

/// Durable persistence for pending tasks.
///
/// # 設計原則
/// - `insert` が成功したタスクだけがメモリ上のキューに入る
/// - `delete` は冪等: 存在しないキーの削除も成功扱い
/// - 順序は保証しない（並べ替えはキュー側の責務）
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Every task that has been inserted and not yet deleted.
    async fn list_pending(&self) -> Result<Vec<ScheduledTask>, StoreError>;

    /// Persist a new pending task.
    async fn insert(&self, task: ScheduledTask) -> Result<(), StoreError>;

    /// Forget a task. Deleting an absent key succeeds.
    async fn delete(&self, key: &TaskKey) -> Result<(), StoreError>;
}
