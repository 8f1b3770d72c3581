use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::mpsc;

use virox_models::{demo_videos, NewVideo, VideoId, VideoRecord};

use super::{LikeEffect, Snapshot, VideoSource};
use crate::error::{FeedError, FeedResult};
use crate::mode::FeedMode;

/// Static dataset, no external I/O.
#[derive(Debug, Clone)]
pub struct DemoSource {
    videos: Vec<VideoRecord>,
}

impl DemoSource {
    pub fn new() -> Self {
        Self {
            videos: demo_videos(Utc::now()),
        }
    }
}

impl Default for DemoSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VideoSource for DemoSource {
    fn mode(&self) -> FeedMode {
        FeedMode::Demo
    }

    fn initial_videos(&self) -> Vec<VideoRecord> {
        self.videos.clone()
    }

    async fn like(&self, _video_id: &VideoId) -> FeedResult<LikeEffect> {
        Ok(LikeEffect::ApplyLocally)
    }

    async fn publish(&self, _video: &NewVideo) -> FeedResult<VideoId> {
        Err(FeedError::UploadDisabled)
    }

    fn subscribe(&self) -> Option<mpsc::Receiver<Snapshot>> {
        None
    }

    async fn check_ready(&self) -> FeedResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_demo_source() {
        let source = DemoSource::new();
        assert_eq!(source.mode(), FeedMode::Demo);

        let ids: Vec<_> = source
            .initial_videos()
            .iter()
            .map(|v| v.id.to_string())
            .collect();
        assert_eq!(ids, vec!["demo-1", "demo-2"]);

        let effect = source.like(&VideoId::from("demo-2")).await.unwrap();
        assert_eq!(effect, LikeEffect::ApplyLocally);
        assert!(source.subscribe().is_none());
        assert!(source.check_ready().await.is_ok());

        let upload = NewVideo::from_upload("a.mp4", "https://x/a.mp4", "a");
        assert!(matches!(
            source.publish(&upload).await,
            Err(FeedError::UploadDisabled)
        ));
    }
}
