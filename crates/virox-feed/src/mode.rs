//! Startup choice between the demo dataset and the live store.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use virox_firestore::config::PLACEHOLDER_MARKER;
use virox_firestore::FirebaseConfig;

use crate::source::{DemoSource, LiveSource, VideoSource};

/// Keys of this length or shorter are treated as unset.
pub const MIN_API_KEY_LEN: usize = 10;

/// Which data source the feed runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedMode {
    Demo,
    Live,
}

impl FeedMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Demo => "demo",
            Self::Live => "live",
        }
    }

    pub fn is_demo(&self) -> bool {
        matches!(self, Self::Demo)
    }
}

impl fmt::Display for FeedMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// True when the Firebase API key has been replaced with a real value.
pub fn is_firebase_configured(config: &FirebaseConfig) -> bool {
    match config.api_key.as_deref() {
        Some(key) => key.chars().count() > MIN_API_KEY_LEN && !key.contains(PLACEHOLDER_MARKER),
        None => false,
    }
}

/// Pick the data source once at startup.
///
/// A configured Firebase app gets the live source. If the live store cannot be
/// initialised the feed falls back to the demo dataset; this is not retried.
pub async fn select_source(
    firebase: &FirebaseConfig,
    poll_interval: Duration,
) -> Arc<dyn VideoSource> {
    if !is_firebase_configured(firebase) {
        info!("DEMO MODE: using sample videos");
        return Arc::new(DemoSource::new());
    }

    match LiveSource::connect(firebase, poll_interval).await {
        Ok(source) => Arc::new(source),
        Err(e) => {
            error!("Failed to initialise Firebase, falling back to demo: {}", e);
            Arc::new(DemoSource::new())
        }
    }
}
