//! Tracing-only collaborators.
//!
//! They stand in for real mail and social-network clients when running the
//! CLI locally: every call succeeds and is logged.

use async_trait::async_trait;
use tracing::info;

use crate::domain::{ExecutionError, Platform};
use crate::ports::{MessageSender, PlatformPoster};

#[derive(Debug, Default, Clone, Copy)]
pub struct LogSender;

#[async_trait]
impl MessageSender for LogSender {
    async fn send(&self, recipient: &str, body: &str) -> Result<(), ExecutionError> {
        info!(recipient, body_len = body.len(), "message sent");
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LogPoster {
    platform: Platform,
}

impl LogPoster {
    pub fn new(platform: Platform) -> Self {
        Self { platform }
    }
}

#[async_trait]
impl PlatformPoster for LogPoster {
    async fn post(&self, owner_id: &str, content_id: &str) -> Result<(), ExecutionError> {
        info!(platform = %self.platform, owner_id, content_id, "content posted");
        Ok(())
    }
}
