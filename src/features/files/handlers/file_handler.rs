use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::debug;

use crate::core::error::AppError;
use crate::core::extractor::AppMultipart;
use crate::features::files::dtos::{content_disposition, UploadFileDto};
use crate::features::files::services::FileService;
use crate::shared::constants::UPLOAD_FIELD_NAME;
use crate::shared::types::MessageResponse;

/// Upload a file
///
/// Accepts multipart/form-data with a `file` field. The object is stored
/// under the uploaded filename, replacing any object with the same name.
#[utoipa::path(
    post,
    path = "/upload/",
    tag = "files",
    request_body(
        content = UploadFileDto,
        content_type = "multipart/form-data",
        description = "File upload form",
    ),
    responses(
        (status = 200, description = "Upload outcome; failures are reported in the message", body = MessageResponse),
    )
)]
pub async fn upload_file(
    State(service): State<Arc<FileService>>,
    AppMultipart(mut multipart): AppMultipart,
) -> Result<Json<MessageResponse>, AppError> {
    let mut upload = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        debug!("Failed to read multipart field: {}", e);
        AppError::BadRequest(format!("Failed to read multipart data: {}", e))
    })? {
        let field_name = field.name().unwrap_or("").to_string();
        if field_name != UPLOAD_FIELD_NAME {
            debug!("Ignoring unknown field: {}", field_name);
            continue;
        }

        let file_name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| AppError::BadRequest("Filename is required".to_string()))?;
        let content_type = field.content_type().map(str::to_string);

        let data = field.bytes().await.map_err(|e| {
            debug!("Failed to read file bytes: {}", e);
            AppError::BadRequest(format!("Failed to read file data: {}", e))
        })?;

        upload = Some((file_name, data, content_type));
    }

    let (file_name, data, content_type) =
        upload.ok_or_else(|| AppError::BadRequest("File is required".to_string()))?;

    let uploaded = service
        .upload(&file_name, data, content_type.as_deref())
        .await?;
    debug!("Stored '{}' ({} bytes)", uploaded.object_name, uploaded.size);

    Ok(Json(MessageResponse::new(uploaded.message())))
}

/// Download an object as an attachment
///
/// The body is streamed from the bucket; the content type is guessed from the
/// object name's extension.
#[utoipa::path(
    get,
    path = "/download/{object_name}",
    tag = "files",
    params(
        ("object_name" = String, Path, description = "Name the object was uploaded under")
    ),
    responses(
        (status = 200, description = "Object bytes as an attachment, or a JSON message when the download failed"),
    )
)]
pub async fn download_file(
    State(service): State<Arc<FileService>>,
    Path(object_name): Path<String>,
) -> Result<Response, AppError> {
    let download = service.download(&object_name).await?;

    let content_type = HeaderValue::from_str(&download.content_type)
        .map_err(|e| AppError::Internal(format!("Invalid content type: {}", e)))?;
    let disposition = HeaderValue::from_str(&content_disposition(&download.object_name))
        .map_err(|e| AppError::Internal(format!("Invalid content disposition: {}", e)))?;

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Body::from_stream(download.stream),
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::files::routes;
    use crate::shared::test_helpers::InMemoryObjectStore;
    use axum::http::StatusCode;
    use axum_test::multipart::{MultipartForm, Part};
    use axum_test::TestServer;

    const MAX_UPLOAD: usize = 64 * 1024 * 1024;

    async fn server() -> (Arc<InMemoryObjectStore>, TestServer) {
        let store = Arc::new(InMemoryObjectStore::with_existing_bucket("sih"));
        let service = Arc::new(FileService::new(store.clone()));
        let server = TestServer::new(routes(service, MAX_UPLOAD)).unwrap();
        (store, server)
    }

    fn file_form(name: &str, data: Vec<u8>, mime: &str) -> MultipartForm {
        MultipartForm::new().add_part(
            "file",
            Part::bytes(data).file_name(name).mime_type(mime),
        )
    }

    #[tokio::test]
    async fn test_upload_then_download_returns_identical_bytes() {
        let (_, server) = server().await;
        let data: Vec<u8> = (0..200_000u32).map(|i| (i * 7 % 256) as u8).collect();

        let response = server
            .post("/upload/")
            .multipart(file_form("sample.pdf", data.clone(), "application/pdf"))
            .await;
        response.assert_status_ok();
        response.assert_json(&MessageResponse::new(
            "File 'sample.pdf' uploaded successfully.",
        ));

        let response = server.get("/download/sample.pdf").await;
        response.assert_status_ok();
        assert_eq!(response.as_bytes().to_vec(), data);
        assert_eq!(response.header(header::CONTENT_TYPE), "application/pdf");
        assert_eq!(
            response.header(header::CONTENT_DISPOSITION),
            "attachment; filename=\"sample.pdf\""
        );
    }

    #[tokio::test]
    async fn test_upload_above_default_body_limit() {
        let (_, server) = server().await;
        let data: Vec<u8> = (0..(3 * 1024 * 1024u32)).map(|i| (i % 253) as u8).collect();

        let response = server
            .post("/upload/")
            .multipart(file_form("big.bin", data.clone(), "application/octet-stream"))
            .await;
        response.assert_status_ok();
        response.assert_json(&MessageResponse::new(
            "File 'big.bin' uploaded successfully.",
        ));

        let response = server.get("/download/big.bin").await;
        assert_eq!(response.as_bytes().len(), data.len());
        assert_eq!(response.as_bytes().to_vec(), data);
    }

    #[tokio::test]
    async fn test_upload_without_trailing_slash() {
        let (store, server) = server().await;

        let response = server
            .post("/upload")
            .multipart(file_form("a.txt", b"hello".to_vec(), "text/plain"))
            .await;

        response.assert_status_ok();
        assert_eq!(store.object("a.txt").await.unwrap().data.as_ref(), b"hello");
    }

    #[tokio::test]
    async fn test_upload_overwrites_existing_object() {
        let (_, server) = server().await;

        for body in [b"first".to_vec(), b"second".to_vec()] {
            server
                .post("/upload/")
                .multipart(file_form("notes.txt", body, "text/plain"))
                .await
                .assert_status_ok();
        }

        let response = server.get("/download/notes.txt").await;
        assert_eq!(response.text(), "second");
    }

    #[tokio::test]
    async fn test_download_missing_object_returns_message() {
        let (_, server) = server().await;

        let response = server.get("/download/nope.bin").await;

        response.assert_status(StatusCode::OK);
        let body: MessageResponse = response.json();
        assert_eq!(
            body.message,
            "An error occurred: Object 'nope.bin' does not exist"
        );

        // The process keeps serving after the failure
        server
            .post("/upload/")
            .multipart(file_form("nope.bin", vec![1, 2, 3], "application/octet-stream"))
            .await
            .assert_status_ok();
        server.get("/download/nope.bin").await.assert_status_ok();
    }

    #[tokio::test]
    async fn test_download_unknown_extension_is_octet_stream() {
        let (_, server) = server().await;
        server
            .post("/upload/")
            .multipart(file_form("archive.zzz", vec![0u8; 16], "application/x-custom"))
            .await
            .assert_status_ok();

        let response = server.get("/download/archive.zzz").await;
        assert_eq!(
            response.header(header::CONTENT_TYPE),
            "application/octet-stream"
        );
    }

    #[tokio::test]
    async fn test_download_percent_encoded_name() {
        let (_, server) = server().await;
        server
            .post("/upload/")
            .multipart(file_form("my report.txt", b"body".to_vec(), "text/plain"))
            .await
            .assert_status_ok();

        let response = server.get("/download/my%20report.txt").await;
        response.assert_status_ok();
        assert_eq!(response.text(), "body");
        assert_eq!(
            response.header(header::CONTENT_DISPOSITION),
            "attachment; filename=\"my report.txt\""
        );
    }

    #[tokio::test]
    async fn test_upload_without_file_field_returns_message() {
        let (_, server) = server().await;

        let form = MultipartForm::new().add_text("comment", "no file here");
        let response = server.post("/upload/").multipart(form).await;

        response.assert_status_ok();
        response.assert_json(&MessageResponse::new(
            "An error occurred: Bad request: File is required",
        ));
    }

    #[tokio::test]
    async fn test_upload_non_multipart_body_returns_message() {
        let (_, server) = server().await;

        let response = server.post("/upload/").text("plain text").await;

        response.assert_status_ok();
        let body: MessageResponse = response.json();
        assert!(body.message.starts_with("An error occurred: Bad request:"));
    }

    #[tokio::test]
    async fn test_upload_into_missing_bucket_returns_message() {
        let store = Arc::new(InMemoryObjectStore::new("sih"));
        let service = Arc::new(FileService::new(store));
        let server = TestServer::new(routes(service, MAX_UPLOAD)).unwrap();

        let response = server
            .post("/upload/")
            .multipart(file_form("a.txt", b"x".to_vec(), "text/plain"))
            .await;

        response.assert_status_ok();
        response.assert_json(&MessageResponse::new(
            "An error occurred: Bucket error: bucket 'sih' does not exist",
        ));
    }
}
