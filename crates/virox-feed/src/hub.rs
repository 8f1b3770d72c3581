//! Page sessions sharing one data source.
//!
//! Every page load opens its own session: a fresh position, its own copy of
//! the list and its own upload status. Live snapshots fan out to every open
//! session and seed the ones opened later. Sessions idle for longer than the
//! TTL are dropped.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use metrics::gauge;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use virox_storage::CloudinaryClient;

use crate::error::FeedResult;
use crate::feed::Feed;
use crate::mode::FeedMode;
use crate::session::SessionId;
use crate::source::{Snapshot, VideoSource};

/// Sessions not seen for this long are dropped.
pub const SESSION_IDLE_TTL: Duration = Duration::from_secs(30 * 60);

/// Upper bound on open sessions.
const MAX_SESSIONS: usize = 10_000;

struct SessionEntry {
    feed: Feed,
    last_seen: Instant,
}

/// Registry of page sessions, cheap to clone.
#[derive(Clone)]
pub struct FeedHub {
    source: Arc<dyn VideoSource>,
    media: CloudinaryClient,
    sessions: Arc<RwLock<HashMap<SessionId, SessionEntry>>>,
    latest: Arc<RwLock<Option<Snapshot>>>,
    idle_ttl: Duration,
}

impl FeedHub {
    pub fn new(source: Arc<dyn VideoSource>, media: CloudinaryClient) -> Self {
        Self {
            source,
            media,
            sessions: Arc::new(RwLock::new(HashMap::new())),
            latest: Arc::new(RwLock::new(None)),
            idle_ttl: SESSION_IDLE_TTL,
        }
    }

    pub fn with_idle_ttl(mut self, ttl: Duration) -> Self {
        self.idle_ttl = ttl;
        self
    }

    pub fn mode(&self) -> FeedMode {
        self.source.mode()
    }

    /// Check that the data source's store answers.
    pub async fn check_ready(&self) -> FeedResult<()> {
        self.source.check_ready().await
    }

    /// Whether uploads can run at all.
    pub fn uploads_enabled(&self) -> bool {
        !self.mode().is_demo() && self.media.is_configured()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Open a session for a new page load.
    ///
    /// It starts at the first video with the latest live snapshot, or with
    /// the source's initial list before any snapshot has arrived.
    pub async fn open_session(&self) -> Feed {
        let mut sessions = self.sessions.write().await;
        self.evict_idle(&mut sessions);

        // Read under the sessions lock so a concurrent snapshot reaches this
        // session either here or through the fan-out.
        let videos = match self.latest.read().await.as_ref() {
            Some(snapshot) => snapshot.clone(),
            None => self.source.initial_videos(),
        };

        let id = SessionId::new();
        let feed = Feed::new(
            id.clone(),
            videos,
            Arc::clone(&self.source),
            self.media.clone(),
        );
        sessions.insert(
            id,
            SessionEntry {
                feed: feed.clone(),
                last_seen: Instant::now(),
            },
        );
        gauge!("virox_feed_sessions").set(sessions.len() as f64);
        debug!(session = %feed.id(), "Opened feed session");
        feed
    }

    /// Look up a session and mark it as seen.
    pub async fn session(&self, id: &SessionId) -> Option<Feed> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(id)?;
        entry.last_seen = Instant::now();
        Some(entry.feed.clone())
    }

    /// Drop idle sessions, then the least recently seen while over capacity.
    fn evict_idle(&self, sessions: &mut HashMap<SessionId, SessionEntry>) {
        let now = Instant::now();
        let before = sessions.len();
        sessions.retain(|_, entry| now.duration_since(entry.last_seen) < self.idle_ttl);

        if sessions.len() >= MAX_SESSIONS {
            let mut entries: Vec<_> = sessions
                .iter()
                .map(|(id, entry)| (id.clone(), entry.last_seen))
                .collect();
            entries.sort_by_key(|(_, seen)| *seen);

            let to_remove = sessions.len() + 1 - MAX_SESSIONS;
            for (id, _) in entries.into_iter().take(to_remove) {
                sessions.remove(&id);
            }
            warn!("Feed session registry full, removed {} sessions", to_remove);
        }

        let evicted = before - sessions.len();
        if evicted > 0 {
            debug!(evicted, "Dropped idle feed sessions");
        }
    }

    /// Start following the source. Each snapshot replaces every session's list.
    pub fn start(&self) -> Option<JoinHandle<()>> {
        let mut snapshots = self.source.subscribe()?;
        let hub = self.clone();

        Some(tokio::spawn(async move {
            while let Some(videos) = snapshots.recv().await {
                hub.apply_snapshot(videos).await;
            }
            warn!("Video subscription ended");
        }))
    }

    pub async fn apply_snapshot(&self, videos: Snapshot) {
        *self.latest.write().await = Some(videos.clone());

        let feeds: Vec<Feed> = self
            .sessions
            .read()
            .await
            .values()
            .map(|entry| entry.feed.clone())
            .collect();
        for feed in &feeds {
            feed.apply_snapshot(videos.clone()).await;
        }
        debug!(count = videos.len(), sessions = feeds.len(), "Applied videos snapshot");
    }
}

impl std::fmt::Debug for FeedHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedHub")
            .field("mode", &self.mode())
            .field("idle_ttl", &self.idle_ttl)
            .finish_non_exhaustive()
    }
}
