//! Typed repository for the `videos` collection.

use std::collections::HashMap;

use tracing::{info, warn};

use virox_models::{NewVideo, VideoId, VideoRecord};

use crate::client::FirestoreClient;
use crate::error::{FirestoreError, FirestoreResult};
use crate::metrics::record_like_written;
use crate::types::{
    Direction, Document, DocumentTransform, FieldTransform, Precondition, StructuredQuery,
    ToFirestoreValue, Value, Write,
};

/// Collection holding the feed.
pub const VIDEOS_COLLECTION: &str = "videos";

/// Document field names.
pub mod fields {
    pub const TITLE: &str = "title";
    pub const URL: &str = "url";
    pub const MEDIA_ID: &str = "cloudinaryId";
    pub const LIKES: &str = "likes";
    pub const CATEGORY: &str = "category";
    pub const CREATED_AT: &str = "createdAt";
}

/// Repository for video documents.
#[derive(Debug, Clone)]
pub struct VideoRepository {
    client: FirestoreClient,
}

impl VideoRepository {
    /// Create a new video repository.
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }

    /// Underlying client.
    pub fn client(&self) -> &FirestoreClient {
        &self.client
    }

    /// All videos, most recent first.
    pub async fn list_newest_first(&self) -> FirestoreResult<Vec<VideoRecord>> {
        let query =
            StructuredQuery::ordered(VIDEOS_COLLECTION, fields::CREATED_AT, Direction::Descending);
        let docs = self.client.run_query(VIDEOS_COLLECTION, query).await?;

        let mut videos = Vec::with_capacity(docs.len());
        for doc in &docs {
            match document_to_video_record(doc) {
                Ok(video) => videos.push(video),
                Err(e) => warn!("Skipping malformed video document: {}", e),
            }
        }
        Ok(videos)
    }

    /// Atomically add one like.
    ///
    /// Fails if the document no longer exists.
    pub async fn increment_likes(&self, video_id: &VideoId) -> FirestoreResult<()> {
        let write = Write {
            transform: Some(DocumentTransform {
                document: self
                    .client
                    .full_document_name(VIDEOS_COLLECTION, document_id(video_id)?),
                field_transforms: vec![FieldTransform::increment(fields::LIKES, 1)],
            }),
            current_document: Some(Precondition { exists: Some(true) }),
            ..Write::default()
        };

        self.client.commit(VIDEOS_COLLECTION, vec![write]).await?;
        record_like_written();
        Ok(())
    }

    /// Create a video record; the store stamps `createdAt` with the commit time.
    pub async fn create(&self, video: &NewVideo) -> FirestoreResult<VideoId> {
        let video_id = VideoId::new();
        let name = self
            .client
            .full_document_name(VIDEOS_COLLECTION, video_id.as_str());

        let write = Write {
            update: Some(Document::named(name, new_video_to_fields(video))),
            update_transforms: Some(vec![FieldTransform::request_time(fields::CREATED_AT)]),
            current_document: Some(Precondition {
                exists: Some(false),
            }),
            ..Write::default()
        };

        self.client.commit(VIDEOS_COLLECTION, vec![write]).await?;
        info!("Created video record: {}", video_id);
        Ok(video_id)
    }
}

/// Validate an id as a single document path segment.
pub fn document_id(video_id: &VideoId) -> FirestoreResult<&str> {
    let id = video_id.as_str();
    if id.is_empty() || id.contains('/') || id == "." || id == ".." {
        return Err(FirestoreError::InvalidDocumentId(id.to_string()));
    }
    Ok(id)
}

/// Map a document to a feed record; the document id becomes the record id.
pub fn document_to_video_record(doc: &Document) -> FirestoreResult<VideoRecord> {
    let id = doc
        .id()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| FirestoreError::InvalidResponse("Document has no name".to_string()))?;

    Ok(VideoRecord {
        id: VideoId::from(id),
        title: doc.field(fields::TITLE),
        url: doc.field(fields::URL).unwrap_or_default(),
        likes: doc.field(fields::LIKES).unwrap_or(0),
        category: doc.field(fields::CATEGORY),
        created_at: doc.field(fields::CREATED_AT),
        media_id: doc.field(fields::MEDIA_ID),
    })
}

fn new_video_to_fields(video: &NewVideo) -> HashMap<String, Value> {
    let mut map = HashMap::new();
    map.insert(fields::TITLE.to_string(), video.title.to_firestore_value());
    map.insert(fields::URL.to_string(), video.url.to_firestore_value());
    map.insert(fields::MEDIA_ID.to_string(), video.media_id.to_firestore_value());
    map.insert(fields::LIKES.to_string(), video.likes.to_firestore_value());
    map.insert(fields::CATEGORY.to_string(), video.category.to_firestore_value());
    map
}
