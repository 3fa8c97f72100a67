//! Task keys.
//!
//! A `TaskKey` is the only identity a pending task has. Two shapes exist:
//!
//! - **composite**: `"{owner}+{content}"`, for tasks bound to an entity
//!   (one scheduled publish per owner and piece of content).
//! - **synthetic**: `"{prefix}-{ulid}"`, for tasks with no natural entity
//!   (e.g. a one-off notification e-mail). See `ports::KeyGenerator`.
//!
//! ## ULID を使う理由
//! - 時刻でソート可能（ログを追いやすい）
//! - 調整なしで生成できる

use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

/// Separator between the owner id and the content id of a composite key.
pub const COMPOSITE_SEPARATOR: char = '+';

/// Opaque, unique identifier of a pending task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskKey(String);

impl TaskKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Composite key for a task bound to an owner and a piece of content.
    pub fn for_content(owner_id: &str, content_id: &str) -> Self {
        Self(format!("{owner_id}{COMPOSITE_SEPARATOR}{content_id}"))
    }

    /// Synthetic key from a ULID, e.g. `notify-01HZX...`.
    pub fn synthetic(prefix: &str, ulid: Ulid) -> Self {
        Self(format!("{prefix}-{ulid}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for TaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for TaskKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for TaskKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}
