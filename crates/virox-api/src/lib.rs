//! Axum HTTP/WS server for the Virox video feed.
//!
//! This crate provides:
//! - The page shell and the feed interaction API, one session per page load
//! - Multipart video upload
//! - Live push of re-rendered markup over WebSocket
//! - Rate limiting, security headers and Prometheus metrics

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod ws;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::{build_app, create_router};
pub use state::AppState;
