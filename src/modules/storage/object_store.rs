//! Object store abstraction used by the gateway
//!
//! The HTTP layer only talks to [`ObjectStore`], so the MinIO client can be
//! swapped for an in-memory store in tests.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use thiserror::Error;

/// Errors raised by an object store backend
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage configuration error: {0}")]
    Config(String),

    #[error("Bucket error: {0}")]
    Bucket(String),

    #[error("Object '{0}' does not exist")]
    NotFound(String),

    #[error("Failed to upload '{key}': {reason}")]
    Upload { key: String, reason: String },

    #[error("Failed to download '{key}': {reason}")]
    Download { key: String, reason: String },
}

/// Outcome of the startup bucket check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketStatus {
    Created,
    AlreadyExists,
}

/// Body of an object, yielded chunk by chunk
pub type ObjectStream = Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Name of the bucket objects are stored in
    fn bucket_name(&self) -> String;

    /// Create the bucket if it does not exist yet. Safe to call repeatedly.
    async fn ensure_bucket_exists(&self) -> Result<BucketStatus, StorageError>;

    /// Store `data` under `key`, returning the number of bytes written
    async fn put_object(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<u64, StorageError>;

    /// Open a streaming read of the object stored under `key`
    async fn get_object_stream(&self, key: &str) -> Result<ObjectStream, StorageError>;
}
