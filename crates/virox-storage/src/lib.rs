//! Cloudinary media upload client.
//!
//! This crate provides:
//! - Cloudinary configuration with placeholder detection
//! - Unsigned video uploads via the upload preset

pub mod client;
pub mod error;

pub use client::{CloudinaryClient, CloudinaryConfig, UploadedMedia};
pub use error::{StorageError, StorageResult};
