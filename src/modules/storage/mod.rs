//! Storage module for object management
//!
//! Provides the [`ObjectStore`] seam and its MinIO/S3-compatible implementation.

mod minio_client;
mod object_store;

pub use minio_client::MinIOClient;
pub use object_store::{BucketStatus, ObjectStore, ObjectStream, StorageError};
