//! Firebase and Firestore configuration.

use std::time::Duration;

use crate::error::{FirestoreError, FirestoreResult};

/// Marker left in every unconfigured credential.
pub const PLACEHOLDER_MARKER: &str = "REPLACE";

/// Firebase web app configuration.
///
/// Every field defaults to a `REPLACE_FIREBASE_*` placeholder so an
/// unconfigured deployment is recognisable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirebaseConfig {
    pub api_key: Option<String>,
    pub auth_domain: String,
    pub project_id: String,
    pub storage_bucket: String,
    pub messaging_sender_id: String,
    pub app_id: String,
}

impl Default for FirebaseConfig {
    fn default() -> Self {
        Self {
            api_key: Some("REPLACE_FIREBASE_API_KEY".to_string()),
            auth_domain: "REPLACE_FIREBASE_AUTH_DOMAIN".to_string(),
            project_id: "REPLACE_FIREBASE_PROJECT_ID".to_string(),
            storage_bucket: "REPLACE_FIREBASE_STORAGE_BUCKET".to_string(),
            messaging_sender_id: "REPLACE_FIREBASE_MESSAGING_SENDER_ID".to_string(),
            app_id: "REPLACE_FIREBASE_APP_ID".to_string(),
        }
    }
}

impl FirebaseConfig {
    /// Create config from environment variables, keeping placeholders for unset ones.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let var = |key: &str, fallback: String| std::env::var(key).unwrap_or(fallback);

        Self {
            // An empty key counts as absent.
            api_key: match std::env::var("FIREBASE_API_KEY") {
                Ok(key) if key.is_empty() => None,
                Ok(key) => Some(key),
                Err(_) => defaults.api_key,
            },
            auth_domain: var("FIREBASE_AUTH_DOMAIN", defaults.auth_domain),
            project_id: var("FIREBASE_PROJECT_ID", defaults.project_id),
            storage_bucket: var("FIREBASE_STORAGE_BUCKET", defaults.storage_bucket),
            messaging_sender_id: var("FIREBASE_MESSAGING_SENDER_ID", defaults.messaging_sender_id),
            app_id: var("FIREBASE_APP_ID", defaults.app_id),
        }
    }
}

/// Firestore client configuration.
#[derive(Debug, Clone)]
pub struct FirestoreConfig {
    /// GCP project ID
    pub project_id: String,
    /// Database ID (usually "(default)")
    pub database_id: String,
    /// Firebase web API key, used when no service account is available
    pub api_key: Option<String>,
    /// `host:port` of a local emulator; disables auth and TLS
    pub emulator_host: Option<String>,
    /// Request timeout
    pub timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
}

impl FirestoreConfig {
    /// Derive the client config from the Firebase web config plus Firestore env tuning.
    pub fn from_firebase(firebase: &FirebaseConfig) -> FirestoreResult<Self> {
        let project_id = firebase.project_id.trim().to_string();
        if project_id.is_empty() || project_id.contains(PLACEHOLDER_MARKER) {
            return Err(FirestoreError::config(
                "FIREBASE_PROJECT_ID must be set to access Firestore",
            ));
        }

        let connect_timeout_secs: u64 = std::env::var("FIRESTORE_CONNECT_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5);

        Ok(Self {
            project_id,
            database_id: std::env::var("FIRESTORE_DATABASE_ID")
                .unwrap_or_else(|_| "(default)".to_string()),
            api_key: firebase.api_key.clone(),
            emulator_host: std::env::var("FIRESTORE_EMULATOR_HOST")
                .ok()
                .filter(|h| !h.is_empty()),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(connect_timeout_secs),
        })
    }

    /// Root URL of the documents tree.
    pub fn documents_url(&self) -> String {
        let origin = match &self.emulator_host {
            Some(host) => format!("http://{}", host.trim_end_matches('/')),
            None => "https://firestore.googleapis.com".to_string(),
        };
        format!(
            "{}/v1/projects/{}/databases/{}/documents",
            origin, self.project_id, self.database_id
        )
    }
}
