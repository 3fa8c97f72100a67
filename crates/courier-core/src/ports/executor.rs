//! Executor ports - タスクの副作用を実行する
//!
//! `TaskExecutor` is what the dispatcher calls; the narrower collaborator
//! traits below are what a `TaskExecutor` is usually assembled from
//! (see `impls::PayloadRouter`).

use async_trait::async_trait;

use crate::domain::{ExecutionError, Platform, ScheduledTask};

/// Performs the side effect of one fired task.
///
/// Called at most once per task, from its own tokio task. The result is
/// logged and counted; it never causes a retry.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    async fn execute(&self, task: &ScheduledTask) -> Result<(), ExecutionError>;
}

/// Delivers a message body to a recipient (e-mail, SMS, ...).
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send(&self, recipient: &str, body: &str) -> Result<(), ExecutionError>;
}

/// Publishes a piece of content to a set of platforms.
///
/// Partial failure is the publisher's business: a platform that succeeded
/// stays published even if another one fails.
#[async_trait]
pub trait ContentPublisher: Send + Sync {
    async fn publish(
        &self,
        owner_id: &str,
        content_id: &str,
        platforms: &[Platform],
    ) -> Result<(), ExecutionError>;
}

/// Posts content to a single platform.
#[async_trait]
pub trait PlatformPoster: Send + Sync {
    async fn post(&self, owner_id: &str, content_id: &str) -> Result<(), ExecutionError>;
}
