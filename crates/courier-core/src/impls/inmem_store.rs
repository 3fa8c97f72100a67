//! InMemoryTaskStore - 開発・テスト用の正本
//!
//! # 学習ポイント
//! - `std::sync::RwLock` で十分（ロックを跨いで await しない）
//! - 障害注入: list / insert / delete を個別に失敗させられる

use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::domain::{ScheduledTask, TaskKey};
use crate::ports::{StoreError, TaskStore};

/// Insertion-ordered, non-durable task store.
///
/// # 使用例
/// ```ignore
/// let store = Arc::new(InMemoryTaskStore::new());
/// store.fail_inserts(true); // next add_task returns SchedulerError::Store
/// ```
#[derive(Debug, Default)]
pub struct InMemoryTaskStore {
    tasks: RwLock<Vec<ScheduledTask>>,
    fail_list: AtomicBool,
    fail_insert: AtomicBool,
    fail_delete: AtomicBool,
    deletes: AtomicUsize,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with records, as if left over from a previous run.
    ///
    /// Records are taken as-is; duplicate keys are kept so recovery can be
    /// exercised against them.
    pub fn with_tasks(tasks: impl IntoIterator<Item = ScheduledTask>) -> Self {
        Self {
            tasks: RwLock::new(tasks.into_iter().collect()),
            ..Self::default()
        }
    }

    pub fn fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    pub fn fail_inserts(&self, fail: bool) {
        self.fail_insert.store(fail, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.read().map(|tasks| tasks.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &TaskKey) -> bool {
        self.read()
            .map(|tasks| tasks.iter().any(|t| t.key() == key))
            .unwrap_or(false)
    }

    /// Successful `delete` calls, including deletes of absent keys.
    pub fn delete_count(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Vec<ScheduledTask>>, StoreError> {
        self.tasks.read().map_err(|_| StoreError::LockPoisoned)
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn list_pending(&self) -> Result<Vec<ScheduledTask>, StoreError> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected list failure".into()));
        }
        Ok(self.read()?.clone())
    }

    async fn insert(&self, task: ScheduledTask) -> Result<(), StoreError> {
        if self.fail_insert.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected insert failure".into()));
        }
        let mut tasks = self.tasks.write().map_err(|_| StoreError::LockPoisoned)?;
        if tasks.iter().any(|t| t.key() == task.key()) {
            return Err(StoreError::DuplicateKey(task.key().clone()));
        }
        tasks.push(task);
        Ok(())
    }

    async fn delete(&self, key: &TaskKey) -> Result<(), StoreError> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected delete failure".into()));
        }
        let mut tasks = self.tasks.write().map_err(|_| StoreError::LockPoisoned)?;
        tasks.retain(|t| t.key() != key);
        self.deletes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
