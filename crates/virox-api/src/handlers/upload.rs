//! Video upload handler.

use axum::extract::Multipart;
use axum::Json;
use tracing::{debug, info};

use virox_feed::{UploadFile, UploadOutcome, CLOUDINARY_NOT_CONFIGURED};

use crate::error::{ApiError, ApiResult};
use crate::extract::PageFeed;
use crate::handlers::feed::FeedResponse;

/// Name used when the browser sends no file name.
const FALLBACK_FILE_NAME: &str = "video";

/// Upload the `file` field and publish it to the live feed.
///
/// Demo mode answers with the unchanged feed. An unconfigured media host
/// answers `412` with the alert text.
pub async fn upload_video(
    PageFeed(feed): PageFeed,
    mut multipart: Multipart,
) -> ApiResult<Json<FeedResponse>> {
    let mut file = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            debug!("Ignoring multipart field {:?}", field.name());
            continue;
        }

        let file_name = field
            .file_name()
            .filter(|name| !name.is_empty())
            .unwrap_or(FALLBACK_FILE_NAME)
            .to_string();
        let content_type = field.content_type().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read file: {}", e)))?;

        file = Some(UploadFile {
            file_name,
            content_type,
            data: data.to_vec(),
        });
        break;
    }

    let file = file.ok_or_else(|| ApiError::bad_request("Missing 'file' field"))?;

    match feed.upload(file).await {
        UploadOutcome::NotConfigured => {
            return Err(ApiError::PreconditionFailed(CLOUDINARY_NOT_CONFIGURED.to_string()))
        }
        UploadOutcome::Disabled => debug!("Upload ignored, no live store"),
        UploadOutcome::Finished(status) => info!("Upload finished: {}", status.text()),
    }

    Ok(Json(FeedResponse::from_feed(&feed).await))
}
