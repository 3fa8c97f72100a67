//! PayloadRouter - ペイロードの種類で実行先を選ぶ
//!
//! # デフォルト実装
//! PayloadRouter は最もシンプルな TaskExecutor 実装です。
//! `Message` は MessageSender へ、`Publish` は ContentPublisher へ 1:1 で渡します。

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{ExecutionError, ScheduledTask, TaskPayload};
use crate::ports::{ContentPublisher, MessageSender, TaskExecutor};

pub struct PayloadRouter {
    sender: Arc<dyn MessageSender>,
    publisher: Arc<dyn ContentPublisher>,
}

impl PayloadRouter {
    pub fn new(sender: Arc<dyn MessageSender>, publisher: Arc<dyn ContentPublisher>) -> Self {
        Self { sender, publisher }
    }
}

#[async_trait]
impl TaskExecutor for PayloadRouter {
    async fn execute(&self, task: &ScheduledTask) -> Result<(), ExecutionError> {
        match task.payload() {
            TaskPayload::Message { recipient, body } => self.sender.send(recipient, body).await,
            TaskPayload::Publish {
                owner_id,
                content_id,
                platforms,
            } => self.publisher.publish(owner_id, content_id, platforms).await,
        }
    }
}
