//! SchedulerBuilder - スケジューラの構築とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）: 設定の検証と復元が成功するまでループを起動しない

use std::sync::Arc;

use tokio::sync::{Mutex, Notify, Semaphore, broadcast, watch};
use tracing::{info, warn};

use super::dispatcher;
use super::error::SchedulerError;
use super::scheduler::{Scheduler, Shared};
use super::status::Counters;
use crate::config::SchedulerConfig;
use crate::ports::{Clock, NoopLedger, PendingLedger, SystemClock, TaskExecutor, TaskStore};
use crate::queue::IndexedHeap;

/// Wires a store, an executor and optional collaborators into a running
/// [`Scheduler`].
///
/// # 使用例
/// ```ignore
/// let scheduler = SchedulerBuilder::new(store, executor)
///     .config(SchedulerConfig { max_in_flight: Some(8), ..Default::default() })
///     .ledger(ledger)
///     .start()
///     .await?;
/// ```
///
/// # Fail-fast 設計
/// - `start()` validates the config before touching the store
/// - every pending task is loaded from the store before the loop is spawned
/// - a recovery failure returns `SchedulerError::Recovery` and spawns nothing
pub struct SchedulerBuilder {
    store: Arc<dyn TaskStore>,
    executor: Arc<dyn TaskExecutor>,
    ledger: Arc<dyn PendingLedger>,
    clock: Arc<dyn Clock>,
    config: SchedulerConfig,
}

impl SchedulerBuilder {
    pub fn new(store: Arc<dyn TaskStore>, executor: Arc<dyn TaskExecutor>) -> Self {
        Self {
            store,
            executor,
            ledger: Arc::new(NoopLedger),
            clock: Arc::new(SystemClock),
            config: SchedulerConfig::default(),
        }
    }

    pub fn config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    /// Owner-side pending lists to update after publish tasks fire.
    pub fn ledger(mut self, ledger: Arc<dyn PendingLedger>) -> Self {
        self.ledger = ledger;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Recover pending tasks and spawn the dispatcher.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn start(self) -> Result<Scheduler, SchedulerError> {
        self.config.validate()?;

        let pending = self
            .store
            .list_pending()
            .await
            .map_err(SchedulerError::Recovery)?;

        let now = self.clock.now();
        let mut heap = IndexedHeap::new();
        let mut overdue = 0usize;
        for task in pending {
            let due = task.is_due(now);
            match heap.push(task) {
                Ok(()) if due => overdue += 1,
                Ok(()) => {}
                Err(dup) => warn!(
                    task_key = %dup.key(),
                    "duplicate key in store during recovery; keeping first record"
                ),
            }
        }
        info!(recovered = heap.len(), overdue, "recovered pending tasks");

        let (outcomes, _) = broadcast::channel(self.config.outcome_buffer);
        let shared = Arc::new(Shared {
            heap: Mutex::new(heap),
            wake: Notify::new(),
            store: self.store,
            executor: self.executor,
            ledger: self.ledger,
            clock: self.clock,
            permits: self
                .config
                .max_in_flight
                .map(|n| Arc::new(Semaphore::new(n))),
            counters: Counters::default(),
            outcomes,
        });

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let exit_rx = dispatcher::spawn(Arc::clone(&shared), shutdown_rx);
        Ok(Scheduler::new(shared, shutdown_tx, exit_rx))
    }
}
