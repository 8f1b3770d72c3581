//! API routes.

use anyhow::Context;
use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::info;

use crate::config::ApiConfig;
use crate::handlers::{
    get_feed, health, index, like_video, next_video, open_session, prev_video, ready, upload_video,
};
use crate::metrics::{init_metrics, metrics_middleware};
use crate::middleware::{cors_layer, rate_limit_middleware, request_id, request_logging, security_headers};
use crate::state::AppState;
use crate::ws::ws_feed;

/// Install the metrics recorder when enabled, then build the state and router.
///
/// The recorder goes in first so metrics recorded while the feed starts are
/// kept.
pub async fn build_app(config: ApiConfig, metrics_enabled: bool) -> anyhow::Result<Router> {
    let metrics_handle = if metrics_enabled {
        info!("Prometheus metrics enabled at /metrics");
        Some(init_metrics().context("failed to install metrics recorder")?)
    } else {
        None
    };

    let state = AppState::new(config)
        .await
        .context("failed to create application state")?;
    Ok(create_router(state, metrics_handle))
}

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let api_routes = Router::new()
        .route("/sessions", post(open_session))
        .route("/feed", get(get_feed))
        .route("/feed/next", post(next_video))
        .route("/feed/prev", post(prev_video))
        .route("/videos/:video_id/like", post(like_video))
        .route("/upload", post(upload_video))
        .layer(middleware::from_fn_with_state(
            state.rate_limiter.clone(),
            rate_limit_middleware,
        ));

    let page_routes = Router::new()
        .route("/", get(index))
        .route("/ws/feed", get(ws_feed));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready));

    let metrics_routes = match metrics_handle {
        Some(handle) => Router::new().route("/metrics", get(move || async move { handle.render() })),
        None => Router::new(),
    };

    Router::new()
        .nest("/api", api_routes)
        .merge(page_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .layer(DefaultBodyLimit::max(state.config.max_body_size))
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
