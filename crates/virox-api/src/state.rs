//! Application state.

use std::sync::Arc;

use metrics::gauge;
use tracing::info;

use virox_feed::{poll_interval_from_env, select_source, FeedHub};
use virox_firestore::FirebaseConfig;
use virox_storage::CloudinaryClient;

use crate::config::ApiConfig;
use crate::middleware::RateLimiterCache;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub hub: FeedHub,
    pub rate_limiter: Arc<RateLimiterCache>,
}

impl AppState {
    /// Create state from environment configuration and start following the
    /// data source.
    pub async fn new(config: ApiConfig) -> anyhow::Result<Self> {
        let firebase = FirebaseConfig::from_env();
        let source = select_source(&firebase, poll_interval_from_env()).await;
        let media = CloudinaryClient::from_env()?;

        let hub = FeedHub::new(source, media).with_idle_ttl(config.session_idle_ttl);
        info!(mode = %hub.mode(), uploads = hub.uploads_enabled(), "Feed ready");
        gauge!("virox_feed_live").set(if hub.mode().is_demo() { 0.0 } else { 1.0 });
        hub.start();

        Ok(Self::with_hub(config, hub))
    }

    /// Wrap an existing hub.
    pub fn with_hub(config: ApiConfig, hub: FeedHub) -> Self {
        let rate_limiter = Arc::new(RateLimiterCache::new(config.rate_limit_rps));
        Self {
            config,
            hub,
            rate_limiter,
        }
    }
}
