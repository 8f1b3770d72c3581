//! Video record models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::fmt;
use uuid::Uuid;

/// Title shown when a record has none.
pub const UNTITLED: &str = "Sin título";

/// Category assigned to freshly uploaded videos.
pub const DEFAULT_CATEGORY: &str = "motivacional";

/// Opaque identifier of a video, unique within the current list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(pub String);

impl VideoId {
    /// Generate a new random document ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for VideoId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for VideoId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for VideoId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A video as shown in the feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoRecord {
    /// Unique ID (Firestore document id in live mode)
    pub id: VideoId,

    /// Display title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Playable media URL
    pub url: String,

    /// Like counter
    #[serde(default)]
    pub likes: u64,

    /// Free-text category label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// Creation time, `None` while a server timestamp is still pending
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    /// Media host public id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_id: Option<String>,
}

impl VideoRecord {
    /// Title to display, falling back to the placeholder.
    pub fn display_title(&self) -> &str {
        match self.title.as_deref() {
            Some(t) if !t.is_empty() => t,
            _ => UNTITLED,
        }
    }

    /// Category to display, empty when absent.
    pub fn display_category(&self) -> &str {
        self.category.as_deref().unwrap_or("")
    }
}

/// Record written to the store after a successful upload.
///
/// `created_at` is not part of it: the store assigns the request time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewVideo {
    pub title: String,
    pub url: String,
    pub media_id: String,
    pub likes: u64,
    pub category: String,
}

impl NewVideo {
    /// Build the record for an uploaded file.
    pub fn from_upload(
        file_name: impl Into<String>,
        secure_url: impl Into<String>,
        public_id: impl Into<String>,
    ) -> Self {
        Self {
            title: file_name.into(),
            url: secure_url.into(),
            media_id: public_id.into(),
            likes: 0,
            category: DEFAULT_CATEGORY.to_string(),
        }
    }
}

/// Sort records by creation time, most recent first.
///
/// Records without a timestamp go last.
pub fn sort_newest_first(videos: &mut [VideoRecord]) {
    videos.sort_by_key(|v| Reverse(v.created_at));
}
