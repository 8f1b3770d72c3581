//! Upload of new videos to the media host.

use std::time::Duration;

use tracing::{error, info};

use virox_models::NewVideo;
use virox_storage::CloudinaryClient;

use crate::error::FeedResult;
use crate::source::VideoSource;

/// How long a finished upload's status stays visible.
pub const STATUS_CLEAR_DELAY: Duration = Duration::from_secs(3);

/// Alert shown when Cloudinary has no real cloud name.
pub const CLOUDINARY_NOT_CONFIGURED: &str =
    "Cloudinary no está configurado. Configura CLOUDINARY_CLOUD_NAME y CLOUDINARY_UPLOAD_PRESET.";

/// Transient status text next to the upload control.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UploadStatus {
    #[default]
    Idle,
    Uploading,
    Complete,
    Failed,
}

impl UploadStatus {
    pub fn text(&self) -> &'static str {
        match self {
            Self::Idle => "",
            Self::Uploading => "Subiendo...",
            Self::Complete => "Subida completa",
            Self::Failed => "Error en subida",
        }
    }
}

/// A file selected in the upload control.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// Result of an upload request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    /// Demo mode or no live store: nothing happened.
    Disabled,
    /// Media host unconfigured: show `CLOUDINARY_NOT_CONFIGURED` and stop.
    NotConfigured,
    /// The upload ran and ended with this status.
    Finished(UploadStatus),
}

/// Send the file to the media host and record it in the store.
pub(crate) async fn upload_and_publish(
    media: &CloudinaryClient,
    source: &dyn VideoSource,
    file: UploadFile,
) -> UploadStatus {
    match try_upload(media, source, file).await {
        Ok(()) => UploadStatus::Complete,
        Err(e) => {
            error!("Upload failed: {}", e);
            UploadStatus::Failed
        }
    }
}

async fn try_upload(
    media: &CloudinaryClient,
    source: &dyn VideoSource,
    file: UploadFile,
) -> FeedResult<()> {
    let uploaded = media
        .upload_video(&file.file_name, file.content_type.as_deref(), file.data)
        .await?;

    let record = NewVideo::from_upload(file.file_name, uploaded.secure_url, uploaded.public_id);
    let video_id = source.publish(&record).await?;
    info!(video_id = %video_id, "Published uploaded video");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_text() {
        assert_eq!(UploadStatus::default().text(), "");
        assert_eq!(UploadStatus::Uploading.text(), "Subiendo...");
        assert_eq!(UploadStatus::Complete.text(), "Subida completa");
        assert_eq!(UploadStatus::Failed.text(), "Error en subida");
    }
}
