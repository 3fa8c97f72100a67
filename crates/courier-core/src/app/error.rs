use thiserror::Error;

use crate::config::ConfigError;
use crate::domain::{TaskKey, ValidationError};
use crate::ports::StoreError;

/// Errors returned by the scheduler handle and its builder.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The store rejected a write; the in-memory queue was left untouched.
    #[error("task store error: {0}")]
    Store(#[from] StoreError),

    /// Loading pending tasks at startup failed. No dispatcher was started.
    #[error("startup recovery failed: {0}")]
    Recovery(#[source] StoreError),

    #[error("a task with key {0} is already scheduled")]
    DuplicateKey(TaskKey),

    #[error("invalid task: {0}")]
    InvalidTask(#[from] ValidationError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The dispatcher has stopped or faulted; build a new scheduler.
    #[error("scheduler is stopped")]
    Stopped,
}
