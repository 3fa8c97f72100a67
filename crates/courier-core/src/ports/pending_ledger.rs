//! PendingLedger port - 呼び出し側の非正規化状態
//!
//! Owners usually keep their own "scheduled" list next to their profile.
//! After a publish task fires, the worker removes the task's key from that
//! list through this port.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::TaskKey;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("owner not found: {0}")]
    OwnerNotFound(String),
}

/// Keyed, idempotent view of each owner's pending tasks.
///
/// Removing a key that is not listed succeeds, so a cancel racing a fire
/// cannot corrupt the list.
#[async_trait]
pub trait PendingLedger: Send + Sync {
    async fn remove(&self, owner_id: &str, key: &TaskKey) -> Result<(), LedgerError>;
}

/// Ledger for deployments that keep no denormalized state.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLedger;

#[async_trait]
impl PendingLedger for NoopLedger {
    async fn remove(&self, _owner_id: &str, _key: &TaskKey) -> Result<(), LedgerError> {
        Ok(())
    }
}
