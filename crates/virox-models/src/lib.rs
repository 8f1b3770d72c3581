//! Shared data models for the Virox video feed.
//!
//! This crate provides Serde-serializable types for:
//! - Video records shown in the feed
//! - New video records written after an upload
//! - The static demo dataset used when no backend is configured

pub mod demo;
pub mod video;

// Re-export common types
pub use demo::{demo_videos, DEMO_VIDEO_COUNT};
pub use video::{sort_newest_first, NewVideo, VideoId, VideoRecord, DEFAULT_CATEGORY, UNTITLED};
