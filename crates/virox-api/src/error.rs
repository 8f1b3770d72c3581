//! API error types.

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use virox_feed::FeedError;

pub type ApiResult<T> = Result<T, ApiError>;

/// Set on responses for a session the server no longer knows, so the page
/// can reload and open a new one.
pub const SESSION_EXPIRED_HEADER: &str = "x-feed-session-expired";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Shown to the user verbatim.
    #[error("{0}")]
    PreconditionFailed(String),

    #[error("Feed session not found")]
    SessionNotFound,

    #[error("Rate limited")]
    RateLimited,

    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::SessionNotFound | ApiError::Feed(FeedError::VideoNotFound(_)) => {
                StatusCode::NOT_FOUND
            }
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PreconditionFailed(_) => StatusCode::PRECONDITION_FAILED,
            ApiError::Feed(FeedError::UploadDisabled) => StatusCode::FORBIDDEN,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Feed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let expired = matches!(self, ApiError::SessionNotFound);

        // Don't expose internal error details in production
        let detail = if status.is_server_error()
            && std::env::var("ENVIRONMENT")
                .unwrap_or_default()
                .eq_ignore_ascii_case("production")
        {
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };

        let mut response = (status, Json(ErrorResponse { detail })).into_response();
        if expired {
            response.headers_mut().insert(
                HeaderName::from_static(SESSION_EXPIRED_HEADER),
                HeaderValue::from_static("1"),
            );
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::Feed(FeedError::VideoNotFound("x".into())).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::PreconditionFailed("configure".into()).status_code(),
            StatusCode::PRECONDITION_FAILED
        );
        assert_eq!(
            ApiError::Feed(FeedError::UploadDisabled).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(ApiError::SessionNotFound.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_expired_session_is_flagged() {
        let response = ApiError::SessionNotFound.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[SESSION_EXPIRED_HEADER], "1");

        let response = ApiError::Feed(FeedError::VideoNotFound("x".into())).into_response();
        assert!(!response.headers().contains_key(SESSION_EXPIRED_HEADER));
    }

    #[test]
    fn test_precondition_detail_is_message() {
        assert_eq!(ApiError::PreconditionFailed("hola".into()).to_string(), "hola");
    }
}
