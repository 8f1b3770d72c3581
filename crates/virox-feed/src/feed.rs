//! One page session: its state, plus the shared data source and media host.
//!
//! Every mutation runs under the session lock and then bumps the revision so
//! the page's socket can re-render. Network calls run outside the lock.

use std::sync::Arc;

use metrics::counter;
use tokio::sync::{watch, RwLock};
use tracing::{debug, error, info, warn};

use virox_models::{VideoId, VideoRecord};
use virox_storage::CloudinaryClient;

use crate::error::{FeedError, FeedResult};
use crate::mode::FeedMode;
use crate::session::{FeedSession, SessionId};
use crate::source::{LikeEffect, VideoSource};
use crate::upload::{upload_and_publish, UploadFile, UploadOutcome, UploadStatus, STATUS_CLEAR_DELAY};

/// Handle to one page session, cheap to clone.
///
/// Sessions are opened through [`FeedHub`](crate::FeedHub).
#[derive(Clone)]
pub struct Feed {
    id: SessionId,
    session: Arc<RwLock<FeedSession>>,
    source: Arc<dyn VideoSource>,
    media: CloudinaryClient,
    revision: Arc<watch::Sender<u64>>,
}

impl Feed {
    pub(crate) fn new(
        id: SessionId,
        videos: Vec<VideoRecord>,
        source: Arc<dyn VideoSource>,
        media: CloudinaryClient,
    ) -> Self {
        let session = FeedSession::new(source.mode(), videos);
        let (revision, _) = watch::channel(0);

        Self {
            id,
            session: Arc::new(RwLock::new(session)),
            source,
            media,
            revision: Arc::new(revision),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn mode(&self) -> FeedMode {
        self.source.mode()
    }

    /// Read the session under the lock.
    pub async fn view<T>(&self, f: impl FnOnce(&FeedSession) -> T) -> T {
        let session = self.session.read().await;
        f(&session)
    }

    /// Full page for this session.
    pub async fn render_page(&self) -> String {
        self.view(|session| session.render_page(&self.id)).await
    }

    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    /// Receiver notified on every change to this session.
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    fn bump(&self) {
        self.revision.send_modify(|r| *r += 1);
    }

    pub(crate) async fn apply_snapshot(&self, videos: Vec<VideoRecord>) {
        self.session.write().await.apply_snapshot(videos);
        self.bump();
    }

    pub async fn next(&self) -> bool {
        let moved = self.session.write().await.next();
        if moved {
            self.bump();
        }
        moved
    }

    pub async fn prev(&self) -> bool {
        let moved = self.session.write().await.prev();
        if moved {
            self.bump();
        }
        moved
    }

    /// Like a video.
    ///
    /// Demo mode updates this session's copy of the record. Live mode asks
    /// the store for an atomic increment; a failed write is logged and
    /// otherwise ignored.
    pub async fn like(&self, video_id: &VideoId) -> FeedResult<()> {
        match self.source.like(video_id).await {
            Ok(LikeEffect::ApplyLocally) => {
                if !self.session.write().await.like_local(video_id) {
                    return Err(FeedError::VideoNotFound(video_id.to_string()));
                }
                self.bump();
            }
            Ok(LikeEffect::Sent) => {}
            Err(e) => {
                error!(session = %self.id, video_id = %video_id, "Error liking video: {}", e);
                return Ok(());
            }
        }

        counter!("virox_feed_likes_total", "mode" => self.mode().as_str()).increment(1);
        Ok(())
    }

    /// Upload a file and record it in the live store.
    pub async fn upload(&self, file: UploadFile) -> UploadOutcome {
        if self.mode().is_demo() {
            debug!(session = %self.id, "Upload ignored in demo mode");
            return UploadOutcome::Disabled;
        }
        if !self.media.is_configured() {
            warn!("Upload rejected: Cloudinary is not configured");
            return UploadOutcome::NotConfigured;
        }

        info!(session = %self.id, file_name = %file.file_name, size = file.data.len(), "Starting upload");
        self.set_upload_status(UploadStatus::Uploading).await;

        let status = upload_and_publish(&self.media, self.source.as_ref(), file).await;
        self.finish_upload(status).await;
        UploadOutcome::Finished(status)
    }

    async fn set_upload_status(&self, status: UploadStatus) {
        self.session.write().await.set_upload_status(status);
        self.bump();
    }

    /// Show the final status, then clear it after the delay.
    async fn finish_upload(&self, status: UploadStatus) {
        self.set_upload_status(status).await;

        let feed = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(STATUS_CLEAR_DELAY).await;
            feed.set_upload_status(UploadStatus::Idle).await;
        });
    }
}

impl std::fmt::Debug for Feed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Feed")
            .field("id", &self.id)
            .field("mode", &self.mode())
            .field("revision", &self.revision())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use serde_json::json;
    use virox_firestore::{FirestoreClient, FirestoreConfig, VideoRepository};
    use virox_storage::CloudinaryConfig;
    use wiremock::matchers::{method, path, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::hub::FeedHub;
    use crate::source::{DemoSource, LiveSource};

    fn unconfigured_media() -> CloudinaryClient {
        CloudinaryClient::new(CloudinaryConfig::default()).unwrap()
    }

    fn media_at(api_base: impl Into<String>) -> CloudinaryClient {
        CloudinaryClient::new(CloudinaryConfig {
            cloud_name: "demo-cloud".to_string(),
            upload_preset: "unsigned".to_string(),
            api_base: api_base.into(),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    fn media_for(server: &MockServer) -> CloudinaryClient {
        media_at(server.uri())
    }

    async fn demo_feed() -> Feed {
        FeedHub::new(Arc::new(DemoSource::new()), unconfigured_media())
            .open_session()
            .await
    }

    async fn live_source(server: &MockServer) -> Arc<dyn VideoSource> {
        let config = FirestoreConfig {
            project_id: "test-project".to_string(),
            database_id: "(default)".to_string(),
            api_key: None,
            emulator_host: Some(server.uri().trim_start_matches("http://").to_string()),
            timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(2),
        };
        let client = FirestoreClient::new(config).await.unwrap();
        Arc::new(LiveSource::new(
            VideoRepository::new(client),
            Duration::from_millis(20),
        ))
    }

    async fn live_feed(firestore: &MockServer, media: CloudinaryClient) -> Feed {
        FeedHub::new(live_source(firestore).await, media)
            .open_session()
            .await
    }

    fn clip() -> UploadFile {
        UploadFile {
            file_name: "clip.mp4".to_string(),
            content_type: Some("video/mp4".to_string()),
            data: b"not really a video".to_vec(),
        }
    }

    async fn mount_cloudinary_ok(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/demo-cloud/video/upload"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "secure_url": "https://res.cloudinary.com/demo-cloud/video/upload/clip.mp4",
                "public_id": "clip"
            })))
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_demo_like_increments_one_record() {
        let feed = demo_feed().await;
        let before = feed.view(|s| s.videos().to_vec()).await;

        feed.like(&VideoId::from("demo-1")).await.unwrap();

        let after = feed.view(|s| s.videos().to_vec()).await;
        assert_eq!(after[0].likes, before[0].likes + 1);
        assert_eq!(after[1].likes, before[1].likes);
        assert_eq!(feed.revision(), 1);
    }

    #[tokio::test]
    async fn test_demo_like_unknown_video() {
        let feed = demo_feed().await;
        let err = feed.like(&VideoId::from("missing")).await.unwrap_err();
        assert!(matches!(err, FeedError::VideoNotFound(_)));
        assert_eq!(feed.revision(), 0);
    }

    #[tokio::test]
    async fn test_navigation_bumps_revision_only_on_move() {
        let feed = demo_feed().await;
        assert!(!feed.prev().await);
        assert_eq!(feed.revision(), 0);
        assert!(feed.next().await);
        assert!(!feed.next().await);
        assert_eq!(feed.revision(), 1);
        assert_eq!(feed.view(|s| s.current_index()).await, 1);
    }

    #[tokio::test]
    async fn test_page_carries_session_id() {
        let feed = demo_feed().await;
        let page = feed.render_page().await;
        assert!(page.contains(&format!(r#"data-session="{}""#, feed.id())));
    }

    #[tokio::test]
    async fn test_demo_upload_is_disabled() {
        let feed = demo_feed().await;
        assert_eq!(feed.upload(clip()).await, UploadOutcome::Disabled);
        assert_eq!(feed.view(|s| s.upload_status()).await, UploadStatus::Idle);
    }

    #[tokio::test]
    async fn test_unconfigured_media_blocks_upload() {
        let server = MockServer::start().await;
        let feed = live_feed(&server, unconfigured_media()).await;

        assert_eq!(feed.upload(clip()).await, UploadOutcome::NotConfigured);
        assert_eq!(feed.view(|s| s.upload_status()).await, UploadStatus::Idle);
        assert!(server.received_requests().await.unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn test_live_like_sends_increment_without_local_change() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex(r"/documents:commit$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "commitTime": "2024-05-01T10:00:00Z"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let feed = live_feed(&server, unconfigured_media()).await;
        feed.apply_snapshot(virox_models::demo_videos(chrono::Utc::now())).await;
        let before = feed.view(|s| s.videos().to_vec()).await;

        feed.like(&VideoId::from("demo-1")).await.unwrap();

        assert_eq!(feed.view(|s| s.videos().to_vec()).await, before);
    }

    #[tokio::test]
    async fn test_live_like_failure_is_swallowed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex(r"/documents:commit$"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let feed = live_feed(&server, unconfigured_media()).await;
        assert!(feed.like(&VideoId::from("v1")).await.is_ok());
        assert_eq!(feed.revision(), 0);
    }

    #[tokio::test]
    async fn test_live_upload_publishes_record() {
        let firestore = MockServer::start().await;
        let cloudinary = MockServer::start().await;
        mount_cloudinary_ok(&cloudinary).await;
        Mock::given(method("POST"))
            .and(path_regex(r"/documents:commit$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "commitTime": "2024-05-01T10:00:00Z"
            })))
            .expect(1)
            .mount(&firestore)
            .await;

        let feed = live_feed(&firestore, media_for(&cloudinary)).await;
        let outcome = feed.upload(clip()).await;
        assert_eq!(outcome, UploadOutcome::Finished(UploadStatus::Complete));
        assert_eq!(feed.view(|s| s.upload_status()).await, UploadStatus::Complete);
    }

    #[tokio::test]
    async fn test_upload_without_secure_url_fails() {
        let firestore = MockServer::start().await;
        let cloudinary = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"public_id": "x"})))
            .mount(&cloudinary)
            .await;
        Mock::given(method("POST"))
            .and(path_regex(r"/documents:commit$"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&firestore)
            .await;

        let feed = live_feed(&firestore, media_for(&cloudinary)).await;
        let outcome = feed.upload(clip()).await;
        assert_eq!(outcome, UploadOutcome::Finished(UploadStatus::Failed));
        assert_eq!(
            feed.view(|s| s.upload_status().text()).await,
            "Error en subida"
        );
    }

    #[tokio::test]
    async fn test_unreachable_media_host_fails_upload() {
        let firestore = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path_regex(r"/documents:commit$"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&firestore)
            .await;

        // Nothing listens on the address once the server is dropped.
        let closed = {
            let server = MockServer::start().await;
            server.uri()
        };

        let feed = live_feed(&firestore, media_at(closed)).await;
        let outcome = feed.upload(clip()).await;
        assert_eq!(outcome, UploadOutcome::Finished(UploadStatus::Failed));
        assert_eq!(
            feed.view(|s| s.upload_status().text()).await,
            "Error en subida"
        );
    }

    #[tokio::test]
    async fn test_store_write_failure_fails_upload() {
        let firestore = MockServer::start().await;
        let cloudinary = MockServer::start().await;
        mount_cloudinary_ok(&cloudinary).await;
        Mock::given(method("POST"))
            .and(path_regex(r"/documents:commit$"))
            .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
            .expect(1)
            .mount(&firestore)
            .await;

        let feed = live_feed(&firestore, media_for(&cloudinary)).await;
        let outcome = feed.upload(clip()).await;
        assert_eq!(outcome, UploadOutcome::Finished(UploadStatus::Failed));
        assert_eq!(feed.view(|s| s.upload_status()).await, UploadStatus::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_clears_after_delay() {
        let feed = demo_feed().await;
        feed.finish_upload(UploadStatus::Complete).await;

        tokio::time::sleep(Duration::from_millis(2900)).await;
        assert_eq!(feed.view(|s| s.upload_status()).await, UploadStatus::Complete);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(feed.view(|s| s.upload_status()).await, UploadStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_upload_status_clears_after_delay() {
        // Neither host is contacted: the store client is only built, and the
        // malformed media URL fails inside the HTTP client.
        let config = FirestoreConfig {
            project_id: "test-project".to_string(),
            database_id: "(default)".to_string(),
            api_key: None,
            emulator_host: Some("127.0.0.1:9".to_string()),
            timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(2),
        };
        let client = FirestoreClient::new(config).await.unwrap();
        let source = Arc::new(LiveSource::new(
            VideoRepository::new(client),
            Duration::from_secs(60),
        ));
        let feed = FeedHub::new(source, media_at("not a url"))
            .open_session()
            .await;

        let outcome = feed.upload(clip()).await;
        assert_eq!(outcome, UploadOutcome::Finished(UploadStatus::Failed));

        tokio::time::sleep(Duration::from_millis(2900)).await;
        assert_eq!(feed.view(|s| s.upload_status()).await, UploadStatus::Failed);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(feed.view(|s| s.upload_status()).await, UploadStatus::Idle);
    }
}
