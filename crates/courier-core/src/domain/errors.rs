//! Errors - ドメインエラー
//!
//! - `ValidationError`: submission-time problems (caller error).
//! - `ExecutionError`: what an executor reports back. Never retried.

use thiserror::Error;

use super::platform::Platform;

/// A task that cannot be accepted as submitted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("task key must not be empty")]
    EmptyKey,

    #[error("message task has no recipient")]
    MissingRecipient,

    #[error("publish task requires an owner id and a content id")]
    MissingPublishTarget,

    #[error("owner id must not contain '+': {0}")]
    SeparatorInOwnerId(String),

    #[error("at least one platform must be specified")]
    NoPlatforms,

    #[error("platform listed more than once: {0}")]
    DuplicatePlatform(Platform),

    #[error("unknown platform: {0}")]
    UnknownPlatform(String),
}

/// Classification of an execution failure, for logs and counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The remote side failed or could not be reached.
    Transient,
    /// The task itself can never succeed (bad recipient, unverified owner, ...).
    Permanent,
}

/// Failure reported by a task executor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    #[error("delivery failed: {0}")]
    Delivery(String),

    #[error("rejected: {0}")]
    Rejected(String),

    #[error("published to {succeeded:?}, failed on {failed:?}")]
    PartialPublish {
        succeeded: Vec<Platform>,
        failed: Vec<(Platform, String)>,
    },

    #[error("no poster configured for platform {0}")]
    UnsupportedPlatform(Platform),
}

impl ExecutionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExecutionError::Delivery(_) | ExecutionError::PartialPublish { .. } => {
                ErrorKind::Transient
            }
            ExecutionError::Rejected(_) | ExecutionError::UnsupportedPlatform(_) => {
                ErrorKind::Permanent
            }
        }
    }
}
