//! Data sources for the feed.
//!
//! A source supplies the ordered video list and reports changes. The demo
//! source is a fixed in-memory list; the live source follows the Firestore
//! `videos` collection.

mod demo;
mod live;

use async_trait::async_trait;
use tokio::sync::mpsc;

use virox_models::{NewVideo, VideoId, VideoRecord};

use crate::error::FeedResult;
use crate::mode::FeedMode;

pub use demo::DemoSource;
pub use live::{poll_interval_from_env, LiveSource, DEFAULT_POLL_INTERVAL};

/// A full replacement of the video list, most recent first.
pub type Snapshot = Vec<VideoRecord>;

/// What the caller must do after a successful like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeEffect {
    /// Increment the local record.
    ApplyLocally,
    /// The store was asked to increment; the next snapshot carries the change.
    Sent,
}

/// Produces the current video list and notifies on change.
#[async_trait]
pub trait VideoSource: Send + Sync {
    fn mode(&self) -> FeedMode;

    /// List shown before any snapshot arrives.
    fn initial_videos(&self) -> Vec<VideoRecord>;

    async fn like(&self, video_id: &VideoId) -> FeedResult<LikeEffect>;

    /// Store a record for an uploaded file.
    async fn publish(&self, video: &NewVideo) -> FeedResult<VideoId>;

    /// Start the change feed. `None` when the list never changes remotely.
    fn subscribe(&self) -> Option<mpsc::Receiver<Snapshot>>;

    /// Check that the backing store answers.
    async fn check_ready(&self) -> FeedResult<()>;
}
