use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

use super::errors::ValidationError;
use super::ids::{COMPOSITE_SEPARATOR, TaskKey};
use super::platform::Platform;

/// What a task does when it fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskPayload {
    /// Deliver a message to a recipient (e.g. an OTP e-mail).
    Message { recipient: String, body: String },

    /// Publish a piece of content on behalf of its owner.
    Publish {
        owner_id: String,
        content_id: String,
        platforms: Vec<Platform>,
    },
}

impl TaskPayload {
    /// Short tag used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            TaskPayload::Message { .. } => "message",
            TaskPayload::Publish { .. } => "publish",
        }
    }
}

/// A unit of scheduled work.
///
/// Fields are private: once submitted a task is never mutated, only moved
/// around inside the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledTask {
    key: TaskKey,
    scheduled_at: DateTime<Utc>,
    payload: TaskPayload,
    created_at: DateTime<Utc>,
}

impl ScheduledTask {
    pub fn new(key: TaskKey, scheduled_at: DateTime<Utc>, payload: TaskPayload) -> Self {
        Self {
            key,
            scheduled_at,
            payload,
            created_at: Utc::now(),
        }
    }

    /// Message task under the given key.
    pub fn message(
        key: TaskKey,
        scheduled_at: DateTime<Utc>,
        recipient: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self::new(
            key,
            scheduled_at,
            TaskPayload::Message {
                recipient: recipient.into(),
                body: body.into(),
            },
        )
    }

    /// Publish task keyed by `owner+content`.
    pub fn publish(
        owner_id: impl Into<String>,
        content_id: impl Into<String>,
        scheduled_at: DateTime<Utc>,
        platforms: Vec<Platform>,
    ) -> Self {
        let owner_id = owner_id.into();
        let content_id = content_id.into();
        Self::new(
            TaskKey::for_content(&owner_id, &content_id),
            scheduled_at,
            TaskPayload::Publish {
                owner_id,
                content_id,
                platforms,
            },
        )
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn key(&self) -> &TaskKey {
        &self.key
    }

    pub fn scheduled_at(&self) -> DateTime<Utc> {
        self.scheduled_at
    }

    pub fn payload(&self) -> &TaskPayload {
        &self.payload
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Owner whose pending list mentions this task, if any.
    pub fn owner_id(&self) -> Option<&str> {
        match &self.payload {
            TaskPayload::Publish { owner_id, .. } => Some(owner_id),
            TaskPayload::Message { .. } => None,
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.scheduled_at <= now
    }

    /// Time left until the task is due; zero when overdue.
    pub fn delay_from(&self, now: DateTime<Utc>) -> Duration {
        (self.scheduled_at - now).to_std().unwrap_or(Duration::ZERO)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.key.is_empty() {
            return Err(ValidationError::EmptyKey);
        }
        match &self.payload {
            TaskPayload::Message { recipient, .. } => {
                if recipient.trim().is_empty() {
                    return Err(ValidationError::MissingRecipient);
                }
            }
            TaskPayload::Publish {
                owner_id,
                content_id,
                platforms,
            } => {
                if owner_id.trim().is_empty() || content_id.trim().is_empty() {
                    return Err(ValidationError::MissingPublishTarget);
                }
                // Keeps `owner+content` keys unambiguous.
                if owner_id.contains(COMPOSITE_SEPARATOR) {
                    return Err(ValidationError::SeparatorInOwnerId(owner_id.clone()));
                }
                if platforms.is_empty() {
                    return Err(ValidationError::NoPlatforms);
                }
                let mut seen = HashSet::new();
                for platform in platforms {
                    if !seen.insert(*platform) {
                        return Err(ValidationError::DuplicatePlatform(*platform));
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn publish_task_uses_composite_key() {
        let task = ScheduledTask::publish("u1", "b1", at(0), vec![Platform::Twitter]);
        assert_eq!(task.key().as_str(), "u1+b1");
        assert_eq!(task.owner_id(), Some("u1"));
        assert!(task.validate().is_ok());
    }

    #[test]
    fn delay_is_clamped_to_zero_when_overdue() {
        let task = ScheduledTask::message(TaskKey::new("m"), at(0), "a@b.c", "hi");
        assert_eq!(task.delay_from(at(10)), Duration::ZERO);
        assert_eq!(task.delay_from(at(-3)), Duration::from_secs(3));
        assert!(task.is_due(at(0)));
        assert!(!task.is_due(at(-1)));
    }

    #[test]
    fn validate_rejects_bad_publish_tasks() {
        let none = ScheduledTask::publish("u1", "b1", at(0), vec![]);
        assert_eq!(none.validate(), Err(ValidationError::NoPlatforms));

        let dup = ScheduledTask::publish(
            "u1",
            "b1",
            at(0),
            vec![Platform::Linkedin, Platform::Linkedin],
        );
        assert_eq!(
            dup.validate(),
            Err(ValidationError::DuplicatePlatform(Platform::Linkedin))
        );

        let no_owner = ScheduledTask::publish("", "b1", at(0), vec![Platform::Twitter]);
        assert_eq!(no_owner.validate(), Err(ValidationError::MissingPublishTarget));
    }

    #[test]
    fn owner_id_with_separator_is_rejected() {
        let split_owner = ScheduledTask::publish("a+b", "c", at(0), vec![Platform::Twitter]);
        let split_content = ScheduledTask::publish("a", "b+c", at(0), vec![Platform::Twitter]);
        assert_eq!(split_owner.key(), split_content.key());

        assert_eq!(
            split_owner.validate(),
            Err(ValidationError::SeparatorInOwnerId("a+b".into()))
        );
        assert!(split_content.validate().is_ok());
    }

    #[test]
    fn validate_rejects_message_without_recipient() {
        let task = ScheduledTask::message(TaskKey::new("m"), at(0), " ", "hi");
        assert_eq!(task.validate(), Err(ValidationError::MissingRecipient));
    }

    #[test]
    fn payload_is_internally_tagged() {
        let task = ScheduledTask::message(TaskKey::new("m"), at(0), "a@b.c", "hi");
        let v = serde_json::to_value(&task).unwrap();
        assert_eq!(v["payload"]["kind"], "message");
        assert_eq!(v["key"], "m");
    }
}
