//! In-memory feed state for one page session.

use std::fmt;

use uuid::Uuid;
use virox_models::{VideoId, VideoRecord};

use crate::mode::FeedMode;
use crate::position::FeedPosition;
use crate::render;
use crate::upload::UploadStatus;

/// Identifies one page load.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The current list, the visible index and the upload status.
#[derive(Debug, Clone)]
pub struct FeedSession {
    videos: Vec<VideoRecord>,
    position: FeedPosition,
    mode: FeedMode,
    upload_status: UploadStatus,
}

impl FeedSession {
    pub fn new(mode: FeedMode, videos: Vec<VideoRecord>) -> Self {
        Self {
            videos,
            position: FeedPosition::new(),
            mode,
            upload_status: UploadStatus::Idle,
        }
    }

    pub fn videos(&self) -> &[VideoRecord] {
        &self.videos
    }

    pub fn mode(&self) -> FeedMode {
        self.mode
    }

    pub fn current_index(&self) -> usize {
        self.position.index()
    }

    pub fn current_video(&self) -> Option<&VideoRecord> {
        self.videos.get(self.position.index())
    }

    pub fn upload_status(&self) -> UploadStatus {
        self.upload_status
    }

    pub fn set_upload_status(&mut self, status: UploadStatus) {
        self.upload_status = status;
    }

    /// Returns true if the position moved.
    pub fn next(&mut self) -> bool {
        self.position.next(self.videos.len())
    }

    /// Returns true if the position moved.
    pub fn prev(&mut self) -> bool {
        self.position.prev()
    }

    /// Replace the whole list and pull the position back inside it.
    pub fn apply_snapshot(&mut self, videos: Vec<VideoRecord>) {
        self.videos = videos;
        self.position.clamp(self.videos.len());
    }

    /// Add one like to a local record. Returns false for an unknown id.
    pub fn like_local(&mut self, video_id: &VideoId) -> bool {
        match self.videos.iter_mut().find(|v| &v.id == video_id) {
            Some(video) => {
                video.likes += 1;
                true
            }
            None => false,
        }
    }

    pub fn render_feed(&self) -> String {
        render::render_feed(&self.videos, self.position.index())
    }

    pub fn render_page(&self, session_id: &SessionId) -> String {
        render::render_page(self, session_id)
    }
}
