//! FanoutPublisher - 複数プラットフォームへの投稿
//!
//! Every requested platform is attempted even after one fails. Platforms
//! that succeeded stay published; the failures come back together as
//! `ExecutionError::PartialPublish`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::{ExecutionError, Platform};
use crate::ports::{ContentPublisher, PlatformPoster};

#[derive(Default)]
pub struct FanoutPublisher {
    posters: HashMap<Platform, Arc<dyn PlatformPoster>>,
}

impl FanoutPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_poster(mut self, platform: Platform, poster: Arc<dyn PlatformPoster>) -> Self {
        self.posters.insert(platform, poster);
        self
    }
}

#[async_trait]
impl ContentPublisher for FanoutPublisher {
    async fn publish(
        &self,
        owner_id: &str,
        content_id: &str,
        platforms: &[Platform],
    ) -> Result<(), ExecutionError> {
        let mut succeeded = Vec::new();
        let mut failed = Vec::new();

        for &platform in platforms {
            let result = match self.posters.get(&platform) {
                Some(poster) => poster.post(owner_id, content_id).await,
                None => Err(ExecutionError::UnsupportedPlatform(platform)),
            };
            match result {
                Ok(()) => {
                    debug!(owner_id, content_id, %platform, "posted");
                    succeeded.push(platform);
                }
                Err(e) => failed.push((platform, e.to_string())),
            }
        }

        if failed.is_empty() {
            Ok(())
        } else {
            Err(ExecutionError::PartialPublish { succeeded, failed })
        }
    }
}
