//! Static demo dataset used when no backend is configured.

use chrono::{DateTime, Duration, Utc};

use crate::video::{sort_newest_first, VideoId, VideoRecord};

/// Number of records in the demo dataset.
pub const DEMO_VIDEO_COUNT: usize = 2;

/// Build the demo dataset relative to `now`, sorted most recent first.
pub fn demo_videos(now: DateTime<Utc>) -> Vec<VideoRecord> {
    let mut videos = vec![
        VideoRecord {
            id: VideoId::from("demo-1"),
            title: Some("Flower (demo)".to_string()),
            url: "https://interactive-examples.mdn.mozilla.net/media/cc0-videos/flower.mp4"
                .to_string(),
            likes: 12,
            category: Some("motivacional".to_string()),
            created_at: Some(now - Duration::milliseconds(1000)),
            media_id: None,
        },
        VideoRecord {
            id: VideoId::from("demo-2"),
            title: Some("Big Buck Bunny (demo)".to_string()),
            url: "https://commondatastorage.googleapis.com/gtv-videos-bucket/sample/BigBuckBunny.mp4"
                .to_string(),
            likes: 3,
            category: Some("educativo".to_string()),
            created_at: Some(now - Duration::milliseconds(2000)),
            media_id: None,
        },
    ];
    sort_newest_first(&mut videos);
    videos
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_dataset_is_newest_first() {
        let videos = demo_videos(Utc::now());
        assert_eq!(videos.len(), DEMO_VIDEO_COUNT);
        assert_eq!(videos[0].id.as_str(), "demo-1");
        assert_eq!(videos[1].id.as_str(), "demo-2");
        assert!(videos[0].created_at > videos[1].created_at);
    }

    #[test]
    fn test_demo_ids_are_unique() {
        let videos = demo_videos(Utc::now());
        assert_ne!(videos[0].id, videos[1].id);
    }
}
