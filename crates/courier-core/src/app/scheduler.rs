//! Scheduler - 呼び出し側が持つハンドル
//!
//! Submission and cancellation are write-through: the store is updated while
//! the heap lock is held, so the heap is always a subset of the store and a
//! failed store write leaves the heap untouched.

use std::sync::Arc;

use tokio::sync::{Mutex, Notify, Semaphore, broadcast, watch};
use tracing::debug;

use super::dispatcher::DispatcherExit;
use super::error::SchedulerError;
use super::status::{Counters, SchedulerState, SchedulerStatus};
use crate::domain::{ScheduledTask, TaskKey, TaskOutcome};
use crate::ports::{Clock, PendingLedger, StoreError, TaskExecutor, TaskStore};
use crate::queue::IndexedHeap;

/// State shared between the handle, the dispatcher loop and workers.
pub(crate) struct Shared {
    pub(crate) heap: Mutex<IndexedHeap>,
    pub(crate) wake: Notify,
    pub(crate) store: Arc<dyn TaskStore>,
    pub(crate) executor: Arc<dyn TaskExecutor>,
    pub(crate) ledger: Arc<dyn PendingLedger>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) permits: Option<Arc<Semaphore>>,
    pub(crate) counters: Counters,
    pub(crate) outcomes: broadcast::Sender<TaskOutcome>,
}

/// Handle to a running dispatcher. Build one with
/// [`SchedulerBuilder`](super::SchedulerBuilder).
///
/// Dropping the handle stops the dispatcher; executors already running are
/// left to finish.
pub struct Scheduler {
    shared: Arc<Shared>,
    shutdown_tx: watch::Sender<bool>,
    exit_rx: watch::Receiver<Option<DispatcherExit>>,
}

impl Scheduler {
    pub(crate) fn new(
        shared: Arc<Shared>,
        shutdown_tx: watch::Sender<bool>,
        exit_rx: watch::Receiver<Option<DispatcherExit>>,
    ) -> Self {
        Self {
            shared,
            shutdown_tx,
            exit_rx,
        }
    }

    /// Validate, persist, then enqueue a task.
    ///
    /// # Errors
    /// - `InvalidTask` / `DuplicateKey`: nothing was written.
    /// - `Store`: the store write failed and the task was not enqueued.
    /// - `Stopped`: the dispatcher is gone.
    pub async fn add_task(&self, task: ScheduledTask) -> Result<(), SchedulerError> {
        self.ensure_running()?;
        task.validate()?;

        let mut heap = self.shared.heap.lock().await;
        if heap.contains(task.key()) {
            return Err(SchedulerError::DuplicateKey(task.key().clone()));
        }
        match self.shared.store.insert(task.clone()).await {
            Ok(()) => {}
            Err(StoreError::DuplicateKey(key)) => return Err(SchedulerError::DuplicateKey(key)),
            Err(e) => return Err(SchedulerError::Store(e)),
        }

        let key = task.key().clone();
        let scheduled_at = task.scheduled_at();
        if let Err(task) = heap.push(task) {
            return Err(SchedulerError::DuplicateKey(task.key().clone()));
        }
        drop(heap);

        self.shared.wake.notify_one();
        debug!(task_key = %key, scheduled_at = %scheduled_at, "task scheduled");
        Ok(())
    }

    /// Cancel a pending task. Unknown or already-fired keys succeed.
    ///
    /// The store record is deleted first; if that fails the task stays queued.
    pub async fn remove_task(&self, key: &TaskKey) -> Result<(), SchedulerError> {
        let mut heap = self.shared.heap.lock().await;
        self.shared.store.delete(key).await?;
        let removed = heap.remove(key).is_some();
        drop(heap);

        if removed {
            self.shared.wake.notify_one();
            debug!(task_key = %key, "task cancelled");
        }
        Ok(())
    }

    /// Ask the dispatcher to exit. Irreversible; returns immediately.
    pub fn stop(&self) {
        self.shutdown_tx.send_replace(true);
    }

    /// Wait until the dispatcher loop has exited.
    pub async fn closed(&self) -> DispatcherExit {
        let mut rx = self.exit_rx.clone();
        match rx.wait_for(Option::is_some).await {
            Ok(exit) => (*exit).clone().unwrap_or(DispatcherExit::Stopped),
            Err(_) => DispatcherExit::Faulted("dispatcher supervisor went away".into()),
        }
    }

    /// `stop()` followed by `closed()`.
    pub async fn shutdown(&self) -> DispatcherExit {
        self.stop();
        self.closed().await
    }

    pub fn state(&self) -> SchedulerState {
        match &*self.exit_rx.borrow() {
            Some(DispatcherExit::Stopped) => SchedulerState::Stopped,
            Some(DispatcherExit::Faulted(_)) => SchedulerState::Faulted,
            None if *self.shutdown_tx.borrow() => SchedulerState::Stopping,
            None => SchedulerState::Running,
        }
    }

    pub async fn status(&self) -> SchedulerStatus {
        let (pending, next_due) = {
            let heap = self.shared.heap.lock().await;
            (heap.len(), heap.peek().map(ScheduledTask::scheduled_at))
        };
        SchedulerStatus {
            state: self.state(),
            pending,
            in_flight: self.shared.counters.in_flight(),
            fired: self.shared.counters.fired(),
            failed: self.shared.counters.failed(),
            next_due,
        }
    }

    /// Keys currently queued, in no particular order.
    pub async fn pending_keys(&self) -> Vec<TaskKey> {
        self.shared.heap.lock().await.keys().cloned().collect()
    }

    /// Receive an outcome for every task that finishes from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<TaskOutcome> {
        self.shared.outcomes.subscribe()
    }

    fn ensure_running(&self) -> Result<(), SchedulerError> {
        match self.state() {
            SchedulerState::Running => Ok(()),
            _ => Err(SchedulerError::Stopped),
        }
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
