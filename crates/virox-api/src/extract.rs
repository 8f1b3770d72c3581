//! Page session extraction.

use axum::extract::{FromRequestParts, Query};
use axum::http::request::Parts;
use serde::Deserialize;

use virox_feed::{Feed, SessionId};

use crate::error::ApiError;
use crate::state::AppState;

/// Header naming the page session on API calls.
pub const SESSION_HEADER: &str = "x-feed-session";

#[derive(Deserialize)]
struct SessionQuery {
    session: Option<String>,
}

/// The page session named by the request.
///
/// Read from the `x-feed-session` header, or the `session` query parameter
/// where headers cannot be set (WebSocket upgrades).
pub struct PageFeed(pub Feed);

#[axum::async_trait]
impl FromRequestParts<AppState> for PageFeed {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let id = session_id(parts).ok_or_else(|| ApiError::bad_request("Missing feed session"))?;

        state
            .hub
            .session(&id)
            .await
            .map(PageFeed)
            .ok_or(ApiError::SessionNotFound)
    }
}

fn session_id(parts: &Parts) -> Option<SessionId> {
    let from_header = parts
        .headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(SessionId::from);
    if from_header.is_some() {
        return from_header;
    }

    Query::<SessionQuery>::try_from_uri(&parts.uri)
        .ok()
        .and_then(|Query(q)| q.session)
        .filter(|v| !v.is_empty())
        .map(SessionId::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(request: Request<()>) -> Parts {
        request.into_parts().0
    }

    #[test]
    fn test_session_from_header_or_query() {
        let request = Request::builder()
            .uri("/api/feed")
            .header(SESSION_HEADER, "abc")
            .body(())
            .unwrap();
        assert_eq!(session_id(&parts(request)), Some(SessionId::from("abc")));

        let request = Request::builder()
            .uri("/ws/feed?session=def")
            .body(())
            .unwrap();
        assert_eq!(session_id(&parts(request)), Some(SessionId::from("def")));

        let request = Request::builder()
            .uri("/ws/feed?session=")
            .header(SESSION_HEADER, " ")
            .body(())
            .unwrap();
        assert_eq!(session_id(&parts(request)), None);
    }
}
