use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, info};

use crate::core::error::{AppError, Result};
use crate::features::files::dtos::{guess_content_type, ObjectDownload, UploadedFile};
use crate::modules::storage::ObjectStore;

/// Service for file operations
pub struct FileService {
    store: Arc<dyn ObjectStore>,
}

impl FileService {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Upload a file to the bucket under its own name
    ///
    /// # Arguments
    /// * `file_name` - The client-supplied filename, used as the object name
    /// * `data` - The whole file content
    /// * `content_type` - The MIME type sent with the file, if any
    pub async fn upload(
        &self,
        file_name: &str,
        data: Bytes,
        content_type: Option<&str>,
    ) -> Result<UploadedFile> {
        if file_name.trim().is_empty() {
            return Err(AppError::BadRequest("Filename is required".to_string()));
        }

        let content_type = content_type
            .filter(|ct| !ct.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| guess_content_type(file_name));

        let size = self
            .store
            .put_object(file_name, data, &content_type)
            .await?;

        info!(
            "File uploaded: name={}, size={}, content_type={}, bucket={}",
            file_name,
            size,
            content_type,
            self.store.bucket_name()
        );

        Ok(UploadedFile {
            object_name: file_name.to_string(),
            size,
        })
    }

    /// Open an object for download
    pub async fn download(&self, object_name: &str) -> Result<ObjectDownload> {
        let stream = self.store.get_object_stream(object_name).await?;
        let content_type = guess_content_type(object_name);

        debug!(
            "Serving download: name={}, content_type={}",
            object_name, content_type
        );

        Ok(ObjectDownload {
            object_name: object_name.to_string(),
            content_type,
            stream,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::storage::StorageError;
    use crate::shared::test_helpers::InMemoryObjectStore;
    use futures::TryStreamExt;

    async fn service() -> (Arc<InMemoryObjectStore>, FileService) {
        let store = Arc::new(InMemoryObjectStore::new("sih"));
        store.ensure_bucket_exists().await.unwrap();
        (store.clone(), FileService::new(store))
    }

    #[tokio::test]
    async fn test_upload_uses_client_content_type() {
        let (store, service) = service().await;

        let uploaded = service
            .upload("scan.bin", Bytes::from_static(b"abc"), Some("image/png"))
            .await
            .unwrap();

        assert_eq!(uploaded.size, 3);
        assert_eq!(store.object("scan.bin").await.unwrap().content_type, "image/png");
    }

    #[tokio::test]
    async fn test_upload_guesses_missing_content_type() {
        let (store, service) = service().await;

        service
            .upload("letter.pdf", Bytes::from_static(b"%PDF"), None)
            .await
            .unwrap();
        service
            .upload("blob", Bytes::from_static(b"??"), Some(""))
            .await
            .unwrap();

        assert_eq!(
            store.object("letter.pdf").await.unwrap().content_type,
            "application/pdf"
        );
        assert_eq!(
            store.object("blob").await.unwrap().content_type,
            "application/octet-stream"
        );
    }

    #[tokio::test]
    async fn test_upload_rejects_blank_name() {
        let (_, service) = service().await;

        let result = service.upload("  ", Bytes::from_static(b"x"), None).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_download_returns_uploaded_bytes() {
        let (_, service) = service().await;
        let data: Vec<u8> = (0..100_000u32).map(|i| (i % 256) as u8).collect();

        service
            .upload("series.dat", Bytes::from(data.clone()), None)
            .await
            .unwrap();

        let download = service.download("series.dat").await.unwrap();
        assert_eq!(download.content_type, "application/octet-stream");

        let chunks: Vec<Bytes> = download.stream.try_collect().await.unwrap();
        assert!(chunks.len() > 1);
        assert_eq!(chunks.concat(), data);
    }

    #[tokio::test]
    async fn test_download_missing_object() {
        let (_, service) = service().await;

        let result = service.download("missing.txt").await;
        assert!(matches!(
            result,
            Err(AppError::Storage(StorageError::NotFound(ref key))) if key == "missing.txt"
        ));
    }
}
