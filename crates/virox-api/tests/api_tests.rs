//! Router tests against in-process feeds.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use virox_api::{create_router, ApiConfig, AppState};
use virox_feed::{DemoSource, FeedHub, LiveSource, CLOUDINARY_NOT_CONFIGURED};
use virox_firestore::{FirestoreClient, FirestoreConfig, VideoRepository};
use virox_storage::{CloudinaryClient, CloudinaryConfig};

const BOUNDARY: &str = "virox-test-boundary";
const SESSION_HEADER: &str = "x-feed-session";

fn unconfigured_media() -> CloudinaryClient {
    CloudinaryClient::new(CloudinaryConfig::default()).unwrap()
}

fn demo_router_with(config: ApiConfig) -> Router {
    let hub = FeedHub::new(Arc::new(DemoSource::new()), unconfigured_media());
    create_router(AppState::with_hub(config, hub), None)
}

fn demo_router() -> Router {
    demo_router_with(ApiConfig::default())
}

/// Live feed whose store is never contacted.
async fn live_router() -> Router {
    let config = FirestoreConfig {
        project_id: "test-project".to_string(),
        database_id: "(default)".to_string(),
        api_key: None,
        emulator_host: Some("127.0.0.1:9".to_string()),
        timeout: Duration::from_secs(1),
        connect_timeout: Duration::from_secs(1),
    };
    let client = FirestoreClient::new(config).await.unwrap();
    let source = LiveSource::new(VideoRepository::new(client), Duration::from_secs(60));
    let hub = FeedHub::new(Arc::new(source), unconfigured_media());
    create_router(AppState::with_hub(ApiConfig::default(), hub), None)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn get_in(session: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(SESSION_HEADER, session)
        .body(Body::empty())
        .unwrap()
}

fn post_in(session: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(SESSION_HEADER, session)
        .body(Body::empty())
        .unwrap()
}

fn upload_request(session: &str, field: &str) -> Request<Body> {
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"clip.mp4\"\r\nContent-Type: video/mp4\r\n\r\nnot really a video\r\n--{b}--\r\n",
        b = BOUNDARY,
        field = field,
    );
    Request::builder()
        .method("POST")
        .uri("/api/upload")
        .header(SESSION_HEADER, session)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}

/// Open a session the way the page does and return its id.
async fn open_page(app: &Router) -> (String, String) {
    let page = body_text(app.clone().oneshot(get("/")).await.unwrap()).await;
    let marker = r#"data-session=""#;
    let start = page.find(marker).unwrap() + marker.len();
    let end = start + page[start..].find('"').unwrap();
    (page[start..end].to_string(), page)
}

#[tokio::test]
async fn test_health_endpoint() {
    let response = demo_router().oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "healthy");
}

#[tokio::test]
async fn test_ready_in_demo_mode() {
    let response = demo_router().oneshot(get("/ready")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ready");
    assert_eq!(body["mode"], "demo");
    assert_eq!(body["uploads_enabled"], false);
    assert_eq!(body["sessions"], 0);
}

#[tokio::test]
async fn test_metrics_route_absent_when_disabled() {
    let response = demo_router().oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_index_page_in_demo_mode() {
    let response = demo_router().oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    assert!(response.headers().contains_key("x-request-id"));

    let page = body_text(response).await;
    assert!(page.contains("Flower (demo)"));
    assert!(page.contains("Subida deshabilitada en modo demo"));
    assert!(page.contains(r#"id="nextBtn""#));
    assert!(page.contains("data-session="));
}

#[tokio::test]
async fn test_feed_is_newest_first() {
    let app = demo_router();
    let (session, _) = open_page(&app).await;
    let body = body_json(app.oneshot(get_in(&session, "/api/feed")).await.unwrap()).await;

    assert_eq!(body["session"], session.as_str());
    assert_eq!(body["index"], 0);
    assert_eq!(body["count"], 2);
    assert_eq!(body["mode"], "demo");
    assert_eq!(body["uploadStatus"], "");

    let html = body["html"].as_str().unwrap();
    assert!(html.find("demo-1").unwrap() < html.find("demo-2").unwrap());
    assert_eq!(html.matches(r#"data-active="true""#).count(), 1);
}

#[tokio::test]
async fn test_open_session_endpoint() {
    let response = demo_router()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/sessions")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert!(!body["session"].as_str().unwrap().is_empty());
    assert_eq!(body["index"], 0);
}

#[tokio::test]
async fn test_session_is_required() {
    let app = demo_router();
    let response = app.clone().oneshot(get("/api/feed")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(post_in("no-such-session", "/api/feed/next"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.headers()["x-feed-session-expired"], "1");
}

#[tokio::test]
async fn test_navigation_never_wraps() {
    let app = demo_router();
    let (session, _) = open_page(&app).await;

    let body = body_json(app.clone().oneshot(post_in(&session, "/api/feed/prev")).await.unwrap()).await;
    assert_eq!(body["index"], 0);

    let body = body_json(app.clone().oneshot(post_in(&session, "/api/feed/next")).await.unwrap()).await;
    assert_eq!(body["index"], 1);

    let body = body_json(app.clone().oneshot(post_in(&session, "/api/feed/next")).await.unwrap()).await;
    assert_eq!(body["index"], 1);
    assert!(body["html"].as_str().unwrap().contains("translateY(-100%)"));
}

#[tokio::test]
async fn test_reload_starts_a_fresh_session() {
    let app = demo_router();
    let (session, _) = open_page(&app).await;

    app.clone().oneshot(post_in(&session, "/api/feed/next")).await.unwrap();
    let response = app
        .clone()
        .oneshot(post_in(&session, "/api/videos/demo-1/like"))
        .await
        .unwrap();
    let html = body_json(response).await["html"].as_str().unwrap().to_string();
    assert!(html.contains(r#"<span class="likes">13</span>"#));

    let (reloaded, page) = open_page(&app).await;
    assert_ne!(reloaded, session);
    assert!(!page.contains("translateY(-100%)"));
    assert!(page.contains(r#"<span class="likes">12</span>"#));
    assert!(!page.contains(r#"<span class="likes">13</span>"#));

    // The first page keeps its own position and likes.
    let body = body_json(app.oneshot(get_in(&session, "/api/feed")).await.unwrap()).await;
    assert_eq!(body["index"], 1);
    assert!(body["html"].as_str().unwrap().contains(r#"<span class="likes">13</span>"#));
}

#[tokio::test]
async fn test_demo_like() {
    let app = demo_router();
    let (session, _) = open_page(&app).await;
    let response = app
        .oneshot(post_in(&session, "/api/videos/demo-2/like"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let html = body_json(response).await["html"].as_str().unwrap().to_string();
    assert!(html.contains(r#"<span class="likes">12</span>"#));
    assert!(html.contains(r#"<span class="likes">4</span>"#));
}

#[tokio::test]
async fn test_like_unknown_video() {
    let app = demo_router();
    let (session, _) = open_page(&app).await;
    let response = app
        .oneshot(post_in(&session, "/api/videos/missing/like"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(!response.headers().contains_key("x-feed-session-expired"));
}

#[tokio::test]
async fn test_like_rejects_nested_document_path() {
    let app = live_router().await;
    let (session, _) = open_page(&app).await;
    let response = app
        .oneshot(post_in(&session, "/api/videos/a%2Fsub%2Fb/like"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_ignored_in_demo_mode() {
    let app = demo_router();
    let (session, _) = open_page(&app).await;
    let response = app.oneshot(upload_request(&session, "file")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["uploadStatus"], "");
    assert_eq!(body["count"], 2);
}

#[tokio::test]
async fn test_upload_without_file_field() {
    let app = demo_router();
    let (session, _) = open_page(&app).await;
    let response = app.oneshot(upload_request(&session, "other")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_requires_cloudinary_config() {
    let app = live_router().await;
    let (session, _) = open_page(&app).await;
    let response = app.oneshot(upload_request(&session, "file")).await.unwrap();
    assert_eq!(response.status(), StatusCode::PRECONDITION_FAILED);
    assert_eq!(body_json(response).await["detail"], CLOUDINARY_NOT_CONFIGURED);
}

#[tokio::test]
async fn test_live_page_starts_empty() {
    let (_, page) = open_page(&live_router().await).await;
    assert!(page.contains("No hay videos aún. Sube el primero."));
    assert!(!page.contains("Subida deshabilitada en modo demo"));
}

#[tokio::test]
async fn test_rate_limiting() {
    let app = demo_router_with(ApiConfig {
        rate_limit_rps: 1,
        ..ApiConfig::default()
    });

    let request = || {
        Request::builder()
            .method("POST")
            .uri("/api/sessions")
            .header("X-Forwarded-For", "192.168.1.100")
            .body(Body::empty())
            .unwrap()
    };

    let first = app.clone().oneshot(request()).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app.clone().oneshot(request()).await.unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(second.headers()["retry-after"], "1");
}
