//! MinIO/S3-compatible storage client
//!
//! Uses rust-s3 crate for lightweight S3 operations. The crate is built
//! without `fail-on-err`, so every response status is checked here.

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::{Bucket, BucketConfiguration, Region};
use tracing::{debug, info, warn};

use super::object_store::{BucketStatus, ObjectStore, ObjectStream, StorageError};
use crate::core::config::MinIOConfig;

/// MinIO/S3-compatible storage client
pub struct MinIOClient {
    bucket: Box<Bucket>,
    region: Region,
    credentials: Credentials,
    endpoint: String,
    part_size: usize,
}

impl MinIOClient {
    /// Create a new MinIO client from configuration.
    ///
    /// No network call is made here; use [`ObjectStore::ensure_bucket_exists`]
    /// once at startup.
    pub fn new(config: MinIOConfig) -> Result<Self, StorageError> {
        config.validate().map_err(StorageError::Config)?;

        let credentials = Credentials::new(
            Some(&config.access_key),
            Some(&config.secret_key),
            None,
            None,
            None,
        )
        .map_err(|e| StorageError::Config(format!("Failed to create MinIO credentials: {}", e)))?;

        let region = Region::Custom {
            region: config.region.clone(),
            endpoint: config.endpoint.clone(),
        };

        let mut bucket = Bucket::new(&config.bucket, region.clone(), credentials.clone())
            .map_err(|e| StorageError::Config(format!("Failed to create MinIO bucket: {}", e)))?;

        // Use path-style URLs for MinIO (http://endpoint/bucket instead of http://bucket.endpoint)
        bucket.set_path_style();

        info!(
            "MinIO client configured for endpoint: {}, bucket: {}, part_size: {}",
            config.endpoint,
            bucket.name(),
            config.part_size
        );

        Ok(Self {
            bucket,
            region,
            credentials,
            endpoint: config.endpoint,
            part_size: config.part_size,
        })
    }

    /// Endpoint the client talks to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn create_bucket(&self) -> Result<BucketStatus, StorageError> {
        let name = self.bucket.name();

        match Bucket::create_with_path_style(
            &name,
            self.region.clone(),
            self.credentials.clone(),
            BucketConfiguration::default(),
        )
        .await
        {
            Ok(response) if response.success() => Ok(BucketStatus::Created),
            // Another instance created it between our check and our create
            Ok(response) if is_already_owned(&response.response_text) => {
                Ok(BucketStatus::AlreadyExists)
            }
            Ok(response) => Err(StorageError::Bucket(format!(
                "Failed to create bucket '{}': {} - {}",
                name, response.response_code, response.response_text
            ))),
            Err(e) if is_already_owned(&e.to_string()) => Ok(BucketStatus::AlreadyExists),
            Err(e) => Err(StorageError::Bucket(format!(
                "Failed to create bucket '{}': {}",
                name, e
            ))),
        }
    }

    async fn put_single(&self, key: &str, data: &[u8], content_type: &str) -> Result<(), StorageError> {
        let response = self
            .bucket
            .put_object_with_content_type(key, data, content_type)
            .await
            .map_err(|e| upload_error(key, e))?;

        let status = response.status_code();
        if !is_success(status) {
            return Err(StorageError::Upload {
                key: key.to_string(),
                reason: format!("{} - {}", status, String::from_utf8_lossy(response.bytes())),
            });
        }
        Ok(())
    }

    async fn put_multipart(
        &self,
        key: &str,
        data: &[u8],
        content_type: &str,
    ) -> Result<(), StorageError> {
        let upload = self
            .bucket
            .initiate_multipart_upload(key, content_type)
            .await
            .map_err(|e| upload_error(key, e))?;
        let upload_id = upload.upload_id;

        let mut parts = Vec::new();
        for (index, chunk) in split_parts(data, self.part_size).enumerate() {
            let part_number = index as u32 + 1;
            match self
                .bucket
                .put_multipart_chunk(chunk.to_vec(), key, part_number, &upload_id, content_type)
                .await
            {
                Ok(part) => parts.push(part),
                Err(e) => {
                    // rust-s3 already aborts when a part comes back with an error
                    // status; this one covers transport failures, so a rejected
                    // second abort is expected
                    if let Err(abort_err) = self.abort_multipart(key, &upload_id).await {
                        debug!(
                            "Abort of multipart upload '{}' for '{}' after part {} failed: {}",
                            upload_id, key, part_number, abort_err
                        );
                    }
                    return Err(upload_error(key, e));
                }
            }
        }

        let part_count = parts.len();
        let response = match self
            .bucket
            .complete_multipart_upload(key, &upload_id, parts)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                self.abort_or_warn(key, &upload_id).await;
                return Err(upload_error(key, e));
            }
        };

        let status = response.status_code();
        if !is_success(status) {
            self.abort_or_warn(key, &upload_id).await;
            return Err(StorageError::Upload {
                key: key.to_string(),
                reason: format!(
                    "complete multipart upload returned {} - {}",
                    status,
                    String::from_utf8_lossy(response.bytes())
                ),
            });
        }

        debug!("Multipart upload of '{}' completed in {} parts", key, part_count);
        Ok(())
    }

    async fn abort_multipart(&self, key: &str, upload_id: &str) -> Result<(), S3Error> {
        self.bucket.abort_upload(key, upload_id).await
    }

    async fn abort_or_warn(&self, key: &str, upload_id: &str) {
        if let Err(e) = self.abort_multipart(key, upload_id).await {
            warn!(
                "Failed to abort multipart upload '{}' for '{}': {}",
                upload_id, key, e
            );
        }
    }
}

#[async_trait]
impl ObjectStore for MinIOClient {
    fn bucket_name(&self) -> String {
        self.bucket.name()
    }

    async fn ensure_bucket_exists(&self) -> Result<BucketStatus, StorageError> {
        let exists = self.bucket.exists().await.map_err(|e| {
            StorageError::Bucket(format!(
                "Failed to check bucket '{}': {}",
                self.bucket.name(),
                e
            ))
        })?;

        if exists {
            debug!("Bucket '{}' already exists", self.bucket.name());
            return Ok(BucketStatus::AlreadyExists);
        }

        self.create_bucket().await
    }

    async fn put_object(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<u64, StorageError> {
        if needs_multipart(data.len(), self.part_size) {
            self.put_multipart(key, &data, content_type).await?;
        } else {
            self.put_single(key, &data, content_type).await?;
        }

        debug!(
            "Uploaded '{}' ({} bytes) to bucket '{}'",
            key,
            data.len(),
            self.bucket.name()
        );
        Ok(data.len() as u64)
    }

    async fn get_object_stream(&self, key: &str) -> Result<ObjectStream, StorageError> {
        // Without fail-on-err an HTTP error status still arrives as Ok, so an
        // Err here is a transport failure and never means the object is missing
        let response = self
            .bucket
            .get_object_stream(key)
            .await
            .map_err(|e| StorageError::Download {
                key: key.to_string(),
                reason: e.to_string(),
            })?;

        match response.status_code {
            status if is_success(status) => {}
            404 => return Err(StorageError::NotFound(key.to_string())),
            status => {
                return Err(StorageError::Download {
                    key: key.to_string(),
                    reason: format!("unexpected status {}", status),
                })
            }
        }

        debug!(
            "Streaming '{}' from bucket '{}'",
            key,
            self.bucket.name()
        );

        let key = key.to_string();
        let stream = response.bytes.map(move |chunk| {
            chunk.map_err(|e| StorageError::Download {
                key: key.clone(),
                reason: e.to_string(),
            })
        });

        Ok(Box::pin(stream))
    }
}

fn upload_error(key: &str, e: S3Error) -> StorageError {
    StorageError::Upload {
        key: key.to_string(),
        reason: e.to_string(),
    }
}

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

fn is_already_owned(message: &str) -> bool {
    message.contains("BucketAlreadyOwnedByYou")
        || message.contains("BucketAlreadyExists")
        || message.contains("already own it")
}

/// Payloads larger than one part are sent as a multipart upload
fn needs_multipart(len: usize, part_size: usize) -> bool {
    len > part_size
}

fn split_parts(data: &[u8], part_size: usize) -> impl Iterator<Item = &[u8]> {
    data.chunks(part_size)
}
