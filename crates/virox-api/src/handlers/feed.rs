//! Feed page and interaction handlers.

use axum::extract::{Path, State};
use axum::response::Html;
use axum::Json;
use serde::Serialize;

use virox_feed::Feed;
use virox_models::VideoId;

use crate::error::{ApiError, ApiResult};
use crate::extract::PageFeed;
use crate::state::AppState;

/// Re-rendered feed sent after every interaction and on live push.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedResponse {
    pub session: String,
    pub html: String,
    pub upload_status: String,
    pub index: usize,
    pub count: usize,
    pub mode: String,
    pub revision: u64,
}

impl FeedResponse {
    pub async fn from_feed(feed: &Feed) -> Self {
        // Read the revision first so a change racing the render is not missed.
        let revision = feed.revision();
        feed.view(|session| Self {
            session: feed.id().to_string(),
            html: session.render_feed(),
            upload_status: session.upload_status().text().to_string(),
            index: session.current_index(),
            count: session.videos().len(),
            mode: session.mode().to_string(),
            revision,
        })
        .await
    }
}

/// Full page. Every load opens a new session.
pub async fn index(State(state): State<AppState>) -> Html<String> {
    let feed = state.hub.open_session().await;
    Html(feed.render_page().await)
}

/// Open a session without the page shell.
pub async fn open_session(State(state): State<AppState>) -> Json<FeedResponse> {
    let feed = state.hub.open_session().await;
    Json(FeedResponse::from_feed(&feed).await)
}

/// Current feed.
pub async fn get_feed(PageFeed(feed): PageFeed) -> Json<FeedResponse> {
    Json(FeedResponse::from_feed(&feed).await)
}

/// Move to the next video; no-op on the last one.
pub async fn next_video(PageFeed(feed): PageFeed) -> Json<FeedResponse> {
    feed.next().await;
    Json(FeedResponse::from_feed(&feed).await)
}

/// Move to the previous video; no-op on the first one.
pub async fn prev_video(PageFeed(feed): PageFeed) -> Json<FeedResponse> {
    feed.prev().await;
    Json(FeedResponse::from_feed(&feed).await)
}

/// Like a video.
pub async fn like_video(
    PageFeed(feed): PageFeed,
    Path(video_id): Path<String>,
) -> ApiResult<Json<FeedResponse>> {
    let video_id = VideoId::from(video_id);
    virox_firestore::document_id(&video_id)
        .map_err(|_| ApiError::bad_request("Invalid video id"))?;

    feed.like(&video_id).await?;
    Ok(Json(FeedResponse::from_feed(&feed).await))
}
