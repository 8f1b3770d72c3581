use std::time::Duration;

use async_trait::async_trait;
use metrics::counter;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use virox_firestore::{FirebaseConfig, FirestoreClient, FirestoreConfig, VideoRepository};
use virox_models::{NewVideo, VideoId, VideoRecord};

use super::{LikeEffect, Snapshot, VideoSource};
use crate::error::FeedResult;
use crate::mode::FeedMode;

/// Delay between snapshot queries when `FIRESTORE_POLL_INTERVAL_MS` is unset.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);

const SNAPSHOT_BUFFER: usize = 8;

/// Source backed by the Firestore `videos` collection.
#[derive(Debug, Clone)]
pub struct LiveSource {
    repo: VideoRepository,
    poll_interval: Duration,
}

impl LiveSource {
    pub fn new(repo: VideoRepository, poll_interval: Duration) -> Self {
        Self {
            repo,
            poll_interval,
        }
    }

    /// Build the Firestore client for a configured Firebase app.
    ///
    /// No request is sent; the first poll is the first contact with the store.
    pub async fn connect(firebase: &FirebaseConfig, poll_interval: Duration) -> FeedResult<Self> {
        let config = FirestoreConfig::from_firebase(firebase)?;
        let client = FirestoreClient::new(config).await?;
        info!("Firestore initialised, subscribing to videos");
        Ok(Self::new(VideoRepository::new(client), poll_interval))
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

/// Poll interval from `FIRESTORE_POLL_INTERVAL_MS`.
pub fn poll_interval_from_env() -> Duration {
    std::env::var("FIRESTORE_POLL_INTERVAL_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .filter(|ms| *ms > 0)
        .map(Duration::from_millis)
        .unwrap_or(DEFAULT_POLL_INTERVAL)
}

#[async_trait]
impl VideoSource for LiveSource {
    fn mode(&self) -> FeedMode {
        FeedMode::Live
    }

    fn initial_videos(&self) -> Vec<VideoRecord> {
        Vec::new()
    }

    async fn like(&self, video_id: &VideoId) -> FeedResult<LikeEffect> {
        self.repo.increment_likes(video_id).await?;
        Ok(LikeEffect::Sent)
    }

    async fn publish(&self, video: &NewVideo) -> FeedResult<VideoId> {
        Ok(self.repo.create(video).await?)
    }

    fn subscribe(&self) -> Option<mpsc::Receiver<Snapshot>> {
        let (tx, rx) = mpsc::channel(SNAPSHOT_BUFFER);
        tokio::spawn(poll_snapshots(self.repo.clone(), self.poll_interval, tx));
        Some(rx)
    }

    async fn check_ready(&self) -> FeedResult<()> {
        // A missing document still proves the store is reachable.
        self.repo.client().get_document("_health", "_check").await?;
        Ok(())
    }
}

/// Query the ordered collection on every tick and forward changed lists.
///
/// The first successful query is always forwarded. Runs until the receiver
/// is dropped.
async fn poll_snapshots(repo: VideoRepository, period: Duration, tx: mpsc::Sender<Snapshot>) {
    info!("Polling videos every {:?}", period);

    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last: Option<Snapshot> = None;

    loop {
        ticker.tick().await;

        let videos = match repo.list_newest_first().await {
            Ok(videos) => videos,
            Err(e) => {
                warn!("Failed to poll videos: {}", e);
                continue;
            }
        };

        if last.as_ref() == Some(&videos) {
            continue;
        }

        counter!("virox_feed_snapshots_total").increment(1);
        debug!(count = videos.len(), "New videos snapshot");
        if tx.send(videos.clone()).await.is_err() {
            debug!("Snapshot receiver dropped, stopping poller");
            break;
        }
        last = Some(videos);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use virox_firestore::FirestoreError;
    use wiremock::matchers::{method, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::error::FeedError;

    async fn live_source(server: &MockServer, poll_interval: Duration) -> LiveSource {
        let config = FirestoreConfig {
            project_id: "test-project".to_string(),
            database_id: "(default)".to_string(),
            api_key: None,
            emulator_host: Some(server.uri().trim_start_matches("http://").to_string()),
            timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(2),
        };
        let client = FirestoreClient::new(config).await.unwrap();
        LiveSource::new(VideoRepository::new(client), poll_interval)
    }

    fn query_result(ids: &[&str]) -> serde_json::Value {
        json!(ids
            .iter()
            .map(|id| json!({
                "document": {
                    "name": format!("projects/test-project/databases/(default)/documents/videos/{id}"),
                    "fields": {
                        "title": {"stringValue": format!("Video {id}")},
                        "url": {"stringValue": format!("https://res.example.com/{id}.mp4")},
                        "likes": {"integerValue": "1"}
                    }
                }
            }))
            .collect::<Vec<_>>())
    }

    #[tokio::test]
    async fn test_first_poll_emits_snapshot() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex(r"/documents:runQuery$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(query_result(&["new", "old"])))
            .mount(&server)
            .await;

        let source = live_source(&server, Duration::from_millis(20)).await;
        assert!(source.initial_videos().is_empty());

        let mut rx = source.subscribe().unwrap();
        let snapshot = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        let ids: Vec<_> = snapshot.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "old"]);

        // Same result on later polls: nothing new is sent.
        let quiet = tokio::time::timeout(Duration::from_millis(200), rx.recv()).await;
        assert!(quiet.is_err());
    }

    #[tokio::test]
    async fn test_poll_failure_is_skipped() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex(r"/documents:runQuery$"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path_regex(r"/documents:runQuery$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(query_result(&["only"])))
            .mount(&server)
            .await;

        let source = live_source(&server, Duration::from_millis(20)).await;
        let mut rx = source.subscribe().unwrap();
        let snapshot = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(snapshot.len(), 1);
    }

    #[tokio::test]
    async fn test_like_failure_surfaces_store_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex(r"/documents:commit$"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let source = live_source(&server, DEFAULT_POLL_INTERVAL).await;
        let err = source.like(&VideoId::from("gone")).await.unwrap_err();
        assert!(matches!(err, FeedError::Firestore(FirestoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_check_ready() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_regex(r"/documents/_health/_check$"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let source = live_source(&server, DEFAULT_POLL_INTERVAL).await;
        assert!(source.check_ready().await.is_ok());
    }

    #[tokio::test]
    async fn test_connect_requires_project_id() {
        let firebase = FirebaseConfig {
            api_key: Some("AIzaSyD-real-looking-key".to_string()),
            ..FirebaseConfig::default()
        };
        let result = LiveSource::connect(&firebase, DEFAULT_POLL_INTERVAL).await;
        assert!(matches!(result, Err(FeedError::Firestore(FirestoreError::Config(_)))));
    }
}
