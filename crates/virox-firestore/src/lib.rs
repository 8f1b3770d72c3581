//! Firestore REST API client.
//!
//! This crate provides:
//! - Firebase web configuration with placeholder detection
//! - A REST client authenticated by service account or Firebase API key
//! - Ordered queries, atomic field increments and server timestamps
//! - A typed repository for the `videos` collection

pub mod client;
pub mod config;
pub mod error;
pub mod metrics;
pub mod repos;
pub mod token_cache;
pub mod types;


pub use client::FirestoreClient;
pub use config::{FirebaseConfig, FirestoreConfig};
pub use error::{FirestoreError, FirestoreResult};
pub use repos::{document_id, VideoRepository, VIDEOS_COLLECTION};
pub use types::{Document, FromFirestoreValue, ToFirestoreValue, Value};
