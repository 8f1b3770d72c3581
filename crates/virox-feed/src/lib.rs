//! Feed session for the Virox short-video feed.
//!
//! This crate provides:
//! - Mode selection between the demo dataset and the live Firestore store
//! - Demo and live data sources behind one `VideoSource` trait
//! - Per-page feed sessions (list, position, upload status) and their
//!   interactions, kept in a registry that fans live snapshots out
//! - HTML rendering of the feed and the page shell

pub mod error;
pub mod feed;
pub mod hub;
pub mod mode;
pub mod position;
pub mod render;
pub mod session;
pub mod source;
pub mod upload;

pub use error::{FeedError, FeedResult};
pub use feed::Feed;
pub use hub::{FeedHub, SESSION_IDLE_TTL};
pub use mode::{is_firebase_configured, select_source, FeedMode, MIN_API_KEY_LEN};
pub use position::FeedPosition;
pub use render::{escape_html, render_feed, render_page, EMPTY_FEED_MESSAGE};
pub use session::{FeedSession, SessionId};
pub use source::{
    poll_interval_from_env, DemoSource, LikeEffect, LiveSource, Snapshot, VideoSource,
    DEFAULT_POLL_INTERVAL,
};
pub use upload::{
    UploadFile, UploadOutcome, UploadStatus, CLOUDINARY_NOT_CONFIGURED, STATUS_CLEAR_DELAY,
};
