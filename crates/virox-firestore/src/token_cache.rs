//! Service account token cache.
//!
//! Tokens are refreshed a minute before expiry. Concurrent callers share a
//! single refresh through the write lock.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use gcp_auth::TokenProvider;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::{FirestoreError, FirestoreResult};

/// Refresh this long before the token expires.
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// OAuth scope for the Firestore REST API.
pub const FIRESTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";

struct CachedToken {
    value: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        Instant::now() + REFRESH_MARGIN < self.expires_at
    }

    fn is_alive(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// Cache of the current access token.
pub struct TokenCache {
    provider: Arc<dyn TokenProvider>,
    slot: RwLock<Option<CachedToken>>,
}

impl TokenCache {
    pub fn new(provider: Arc<dyn TokenProvider>) -> Self {
        Self {
            provider,
            slot: RwLock::new(None),
        }
    }

    /// Drop the cached token so the next call fetches a new one.
    pub async fn invalidate(&self) {
        *self.slot.write().await = None;
    }

    /// Return a fresh token, refreshing under the write lock when needed.
    pub async fn get_token(&self) -> FirestoreResult<String> {
        if let Some(cached) = self.slot.read().await.as_ref().filter(|t| t.is_fresh()) {
            return Ok(cached.value.clone());
        }

        let mut slot = self.slot.write().await;
        if let Some(cached) = slot.as_ref().filter(|t| t.is_fresh()) {
            return Ok(cached.value.clone());
        }

        match self.provider.token(&[FIRESTORE_SCOPE]).await {
            Ok(token) => {
                let ttl = (token.expires_at() - Utc::now())
                    .to_std()
                    .unwrap_or(Duration::ZERO);
                let value = token.as_str().to_string();
                *slot = Some(CachedToken {
                    value: value.clone(),
                    expires_at: Instant::now() + ttl,
                });
                debug!(ttl_secs = ttl.as_secs(), "Refreshed Firestore access token");
                Ok(value)
            }
            // A failed refresh can still ride on a token that has not expired yet.
            Err(e) => match slot.as_ref().filter(|t| t.is_alive()) {
                Some(cached) => {
                    warn!("Token refresh failed, reusing current token: {}", e);
                    Ok(cached.value.clone())
                }
                None => Err(FirestoreError::auth_error(format!(
                    "Failed to obtain access token: {}",
                    e
                ))),
            },
        }
    }
}
