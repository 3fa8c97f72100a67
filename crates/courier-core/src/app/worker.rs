//! Worker - 発火したタスク1件の実行
//!
//! Runs in its own tokio task. Whatever the executor returns, the task is
//! forgotten afterwards: deleted from the store, dropped from its owner's
//! pending list, counted. Nothing is retried.

use std::sync::Arc;

use tracing::{info, warn};

use super::dispatcher::describe_join_error;
use super::scheduler::Shared;
use crate::domain::{ExecutionError, ScheduledTask, TaskOutcome};

pub(crate) async fn run_task(shared: Arc<Shared>, task: ScheduledTask) {
    // Run the executor in a child task so a panic is reported as a failure
    // instead of leaking the in-flight counter and the store record.
    let executor = Arc::clone(&shared.executor);
    let owned = task.clone();
    let result = match tokio::spawn(async move { executor.execute(&owned).await }).await {
        Ok(result) => result,
        Err(e) => Err(ExecutionError::Rejected(describe_join_error(e, "executor"))),
    };

    match &result {
        Ok(()) => info!(
            task_key = %task.key(),
            kind = task.payload().kind(),
            scheduled_at = %task.scheduled_at(),
            "task executed"
        ),
        Err(e) => warn!(
            task_key = %task.key(),
            kind = task.payload().kind(),
            error = %e,
            error_kind = ?e.kind(),
            "task executed with errors"
        ),
    }

    if let Err(e) = shared.store.delete(task.key()).await {
        warn!(task_key = %task.key(), error = %e, "failed to delete fired task from store");
    }

    if let Some(owner_id) = task.owner_id() {
        if let Err(e) = shared.ledger.remove(owner_id, task.key()).await {
            warn!(
                task_key = %task.key(),
                owner_id,
                error = %e,
                "failed to update owner's pending list"
            );
        }
    }

    shared.counters.finished(result.is_ok());

    let outcome = TaskOutcome::from_result(
        task.key().clone(),
        task.scheduled_at(),
        shared.clock.now(),
        &result,
    );
    // No subscribers is fine.
    let _ = shared.outcomes.send(outcome);
}
