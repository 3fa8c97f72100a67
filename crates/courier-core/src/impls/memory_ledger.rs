//! InMemoryPendingLedger - 所有者ごとの予約リスト（開発・テスト用）

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::TaskKey;
use crate::ports::{LedgerError, PendingLedger};

/// Per-owner list of scheduled task keys, as a profile record would keep it.
#[derive(Debug, Default)]
pub struct InMemoryPendingLedger {
    owners: RwLock<HashMap<String, Vec<TaskKey>>>,
}

impl InMemoryPendingLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an owner with an empty list.
    pub fn add_owner(&self, owner_id: &str) {
        let mut owners = self.owners.write().unwrap_or_else(|e| e.into_inner());
        owners.entry(owner_id.to_string()).or_default();
    }

    /// Record a key as pending for `owner_id`, creating the owner if needed.
    pub fn record(&self, owner_id: &str, key: TaskKey) {
        let mut owners = self.owners.write().unwrap_or_else(|e| e.into_inner());
        let keys = owners.entry(owner_id.to_string()).or_default();
        if !keys.contains(&key) {
            keys.push(key);
        }
    }

    pub fn pending(&self, owner_id: &str) -> Vec<TaskKey> {
        let owners = self.owners.read().unwrap_or_else(|e| e.into_inner());
        owners.get(owner_id).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl PendingLedger for InMemoryPendingLedger {
    async fn remove(&self, owner_id: &str, key: &TaskKey) -> Result<(), LedgerError> {
        let mut owners = self.owners.write().unwrap_or_else(|e| e.into_inner());
        let keys = owners
            .get_mut(owner_id)
            .ok_or_else(|| LedgerError::OwnerNotFound(owner_id.to_string()))?;
        keys.retain(|k| k != key);
        Ok(())
    }
}
