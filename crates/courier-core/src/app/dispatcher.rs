//! Dispatcher - 単一の制御ループ
//!
//! One tokio task per scheduler. Each iteration peeks at the head of the
//! queue and waits on whichever comes first:
//! - the head becoming due (timer)
//! - the queue changing (`Notify` from `add_task` / `remove_task`)
//! - shutdown (`watch`)
//!
//! The heap lock is taken only to peek and to pop; it is never held across
//! the timer or an executor call.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, watch};
use tokio::task::JoinError;
use tracing::{debug, error, info};

use super::scheduler::Shared;
use super::worker;
use crate::domain::ScheduledTask;
use crate::queue::IndexedHeap;

/// How a dispatcher loop ended. Either way the scheduler cannot be restarted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatcherExit {
    /// `stop()` was called or the scheduler handle was dropped.
    Stopped,
    /// The loop detected a broken queue invariant or panicked.
    Faulted(String),
}

/// Spawn the loop plus a small supervisor that publishes its exit.
pub(crate) fn spawn(
    shared: Arc<Shared>,
    shutdown: watch::Receiver<bool>,
) -> watch::Receiver<Option<DispatcherExit>> {
    let (exit_tx, exit_rx) = watch::channel(None);
    let handle = tokio::spawn(run(shared, shutdown));

    tokio::spawn(async move {
        let exit = match handle.await {
            Ok(exit) => exit,
            Err(e) => DispatcherExit::Faulted(describe_join_error(e, "dispatcher")),
        };
        match &exit {
            DispatcherExit::Stopped => info!("dispatcher stopped"),
            DispatcherExit::Faulted(reason) => error!(reason = %reason, "dispatcher faulted"),
        }
        exit_tx.send_replace(Some(exit));
    });

    exit_rx
}

async fn run(shared: Arc<Shared>, mut shutdown: watch::Receiver<bool>) -> DispatcherExit {
    info!("dispatcher started");
    loop {
        let next_due = {
            let heap = shared.heap.lock().await;
            heap.peek()
                .map(|head| (head.scheduled_at(), head.delay_from(shared.clock.now())))
        };

        match next_due {
            None => {
                tokio::select! {
                    biased;
                    _ = shutdown_requested(&mut shutdown) => return DispatcherExit::Stopped,
                    _ = shared.wake.notified() => continue,
                }
            }
            Some((due, delay)) => {
                if !delay.is_zero() {
                    debug!(next_due = %due, delay_ms = delay.as_millis() as u64, "dispatcher armed");
                    tokio::select! {
                        biased;
                        _ = shutdown_requested(&mut shutdown) => return DispatcherExit::Stopped,
                        _ = shared.wake.notified() => continue,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }

        if shutdown_signalled(&shutdown) {
            return DispatcherExit::Stopped;
        }

        let permit = match acquire_permit(&shared, &mut shutdown).await {
            Ok(permit) => permit,
            Err(exit) => return exit,
        };

        let popped = {
            let mut heap = shared.heap.lock().await;
            let now = shared.clock.now();
            // Head may have been cancelled or replaced while we waited.
            let head_due = heap.peek().is_some_and(|head| head.is_due(now));
            let task = if head_due { heap.pop() } else { None };
            if let Some(task) = &task {
                if let Err(reason) = verify_pop(&heap, task) {
                    return DispatcherExit::Faulted(reason);
                }
            }
            task
        };

        if let Some(task) = popped {
            fire(&shared, task, permit);
        }
    }
}

fn fire(shared: &Arc<Shared>, task: ScheduledTask, permit: Option<OwnedSemaphorePermit>) {
    debug!(
        task_key = %task.key(),
        scheduled_at = %task.scheduled_at(),
        kind = task.payload().kind(),
        "firing task"
    );
    shared.counters.started();
    let shared = Arc::clone(shared);
    tokio::spawn(async move {
        worker::run_task(shared, task).await;
        drop(permit);
    });
}

async fn acquire_permit(
    shared: &Shared,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<Option<OwnedSemaphorePermit>, DispatcherExit> {
    let Some(semaphore) = &shared.permits else {
        return Ok(None);
    };
    tokio::select! {
        biased;
        _ = shutdown_requested(shutdown) => Err(DispatcherExit::Stopped),
        permit = Arc::clone(semaphore).acquire_owned() => permit
            .map(Some)
            .map_err(|_| DispatcherExit::Faulted("executor semaphore closed".into())),
    }
}

/// Resolves once shutdown is requested. A dropped sender counts as shutdown.
async fn shutdown_requested(rx: &mut watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}

fn shutdown_signalled(rx: &watch::Receiver<bool>) -> bool {
    *rx.borrow() || rx.has_changed().is_err()
}

/// Cheap post-pop sanity check; the full invariant walk only runs in debug builds.
fn verify_pop(heap: &IndexedHeap, popped: &ScheduledTask) -> Result<(), String> {
    if heap.contains(popped.key()) {
        return Err(format!("popped task {} is still indexed", popped.key()));
    }
    if let Some(head) = heap.peek() {
        if head.scheduled_at() < popped.scheduled_at() {
            return Err(format!(
                "heap order broken: {} (due {}) popped before {} (due {})",
                popped.key(),
                popped.scheduled_at(),
                head.key(),
                head.scheduled_at()
            ));
        }
    }
    if cfg!(debug_assertions) {
        heap.check_invariants().map_err(|v| v.to_string())?;
    }
    Ok(())
}

pub(crate) fn describe_join_error(err: JoinError, what: &str) -> String {
    if !err.is_panic() {
        return format!("{what} task was cancelled");
    }
    let payload = err.into_panic();
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string());
    format!("{what} panicked: {message}")
}
