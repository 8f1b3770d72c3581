//! Feed error types.

use thiserror::Error;

use virox_firestore::FirestoreError;
use virox_storage::StorageError;

/// Result type for feed operations.
pub type FeedResult<T> = Result<T, FeedError>;

/// Errors raised by feed sources and interactions.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Video not found: {0}")]
    VideoNotFound(String),

    #[error("Uploads are disabled without a live store")]
    UploadDisabled,

    #[error("Live store error: {0}")]
    Firestore(#[from] FirestoreError),

    #[error("Media upload error: {0}")]
    Storage(#[from] StorageError),
}
