//! Outcome model: what happened when a task fired.
//!
//! Outcomes are reported after the fact (logs, status counters, subscribers).
//! They never feed back into scheduling: a failed task is not re-queued.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::ExecutionError;
use super::ids::TaskKey;

/// Serialized as SUCCESS / FAILURE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutcomeKind {
    Success,
    Failure,
}

/// Result of one fired task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskOutcome {
    pub key: TaskKey,
    pub kind: OutcomeKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    pub scheduled_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl TaskOutcome {
    pub fn from_result(
        key: TaskKey,
        scheduled_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        result: &Result<(), ExecutionError>,
    ) -> Self {
        let (kind, reason) = match result {
            Ok(()) => (OutcomeKind::Success, None),
            Err(e) => (OutcomeKind::Failure, Some(e.to_string())),
        };
        Self {
            key,
            kind,
            reason,
            scheduled_at,
            finished_at,
        }
    }

    pub fn is_success(&self) -> bool {
        self.kind == OutcomeKind::Success
    }

    /// How late the task finished relative to its schedule.
    pub fn lateness(&self) -> chrono::Duration {
        self.finished_at - self.scheduled_at
    }
}
