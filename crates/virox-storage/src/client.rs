//! Cloudinary client implementation.

use std::time::{Duration, Instant};

use metrics::{counter, histogram};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error, info};

use crate::error::{StorageError, StorageResult};

const DEFAULT_API_BASE: &str = "https://api.cloudinary.com/v1_1";

/// Marker left in unconfigured values.
const PLACEHOLDER_MARKER: &str = "REPLACE";

/// Configuration for the Cloudinary client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudinaryConfig {
    /// Cloud name (account)
    pub cloud_name: String,
    /// Unsigned upload preset
    pub upload_preset: String,
    /// API origin, overridable for tests
    pub api_base: String,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for CloudinaryConfig {
    fn default() -> Self {
        Self {
            cloud_name: "REPLACE_CLOUD_NAME".to_string(),
            upload_preset: "REPLACE_UNSIGNED_PRESET".to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            timeout: Duration::from_secs(300),
        }
    }
}

impl CloudinaryConfig {
    /// Create config from environment variables, keeping placeholders for unset ones.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cloud_name: std::env::var("CLOUDINARY_CLOUD_NAME").unwrap_or(defaults.cloud_name),
            upload_preset: std::env::var("CLOUDINARY_UPLOAD_PRESET")
                .unwrap_or(defaults.upload_preset),
            api_base: std::env::var("CLOUDINARY_API_BASE").unwrap_or(defaults.api_base),
            timeout: std::env::var("CLOUDINARY_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        }
    }

    /// True once the cloud name holds a real value.
    pub fn is_configured(&self) -> bool {
        !self.cloud_name.is_empty() && !self.cloud_name.contains(PLACEHOLDER_MARKER)
    }

    /// Video upload endpoint.
    pub fn upload_url(&self) -> String {
        format!(
            "{}/{}/video/upload",
            self.api_base.trim_end_matches('/'),
            self.cloud_name
        )
    }
}

/// A successfully uploaded asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedMedia {
    pub secure_url: String,
    pub public_id: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
    public_id: Option<String>,
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Cloudinary upload client.
#[derive(Debug, Clone)]
pub struct CloudinaryClient {
    http: Client,
    config: CloudinaryConfig,
}

impl CloudinaryClient {
    /// Create a new client from configuration.
    pub fn new(config: CloudinaryConfig) -> StorageResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("virox-storage/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| StorageError::config_error(e.to_string()))?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Self::new(CloudinaryConfig::from_env())
    }

    pub fn config(&self) -> &CloudinaryConfig {
        &self.config
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    /// Upload a video file with the unsigned preset.
    ///
    /// Success requires a `secure_url` in the response body, whatever the
    /// HTTP status.
    pub async fn upload_video(
        &self,
        file_name: &str,
        content_type: Option<&str>,
        data: Vec<u8>,
    ) -> StorageResult<UploadedMedia> {
        if !self.is_configured() {
            return Err(StorageError::NotConfigured(
                "set CLOUDINARY_CLOUD_NAME and CLOUDINARY_UPLOAD_PRESET".to_string(),
            ));
        }

        let size = data.len();
        let mut part = Part::bytes(data).file_name(file_name.to_string());
        if let Some(mime) = content_type {
            part = part
                .mime_str(mime)
                .map_err(|e| StorageError::upload_failed(format!("invalid content type: {}", e)))?;
        }
        let form = Form::new()
            .part("file", part)
            .text("upload_preset", self.config.upload_preset.clone());

        debug!(file_name, size, "Uploading video to Cloudinary");
        let start = Instant::now();
        let result = self.send_upload(form).await;
        histogram!("virox_upload_duration_seconds").record(start.elapsed().as_secs_f64());

        let outcome = if result.is_ok() { "success" } else { "failure" };
        counter!("virox_uploads_total", "outcome" => outcome).increment(1);

        match &result {
            Ok(media) => info!(public_id = %media.public_id, "Uploaded video {}", file_name),
            Err(e) => error!("Cloudinary upload of {} failed: {}", file_name, e),
        }
        result
    }

    async fn send_upload(&self, form: Form) -> StorageResult<UploadedMedia> {
        let response = self
            .http
            .post(self.config.upload_url())
            .multipart(form)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        let parsed: UploadResponse = serde_json::from_str(&body)?;

        match parsed.secure_url {
            Some(secure_url) => Ok(UploadedMedia {
                secure_url,
                public_id: parsed.public_id.unwrap_or_default(),
            }),
            None => Err(StorageError::upload_failed(match parsed.error {
                Some(err) => format!("{} ({})", err.message, status),
                None => format!("response without secure_url ({})", status),
            })),
        }
    }
}
