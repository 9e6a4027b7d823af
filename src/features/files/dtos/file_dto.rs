use utoipa::ToSchema;

use crate::modules::storage::ObjectStream;
use crate::shared::constants::DEFAULT_CONTENT_TYPE;

/// Upload file request DTO for OpenAPI documentation
/// Note: This struct is for Swagger UI documentation only.
/// The actual handler reads the multipart body directly.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct UploadFileDto {
    /// The file to upload; its filename becomes the object name
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub file: String,
}

/// Result of a successful upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub object_name: String,
    pub size: u64,
}

impl UploadedFile {
    pub fn message(&self) -> String {
        format!("File '{}' uploaded successfully.", self.object_name)
    }
}

/// An object ready to be streamed back to the client
pub struct ObjectDownload {
    pub object_name: String,
    pub content_type: String,
    pub stream: ObjectStream,
}

/// Guess a MIME type from the object name's extension
pub fn guess_content_type(object_name: &str) -> String {
    mime_guess::from_path(object_name)
        .first()
        .map(|mime| mime.essence_str().to_string())
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string())
}

/// Build an `attachment` Content-Disposition value for `object_name`.
///
/// Names that cannot sit inside a quoted header string get an RFC 5987
/// `filename*` parameter, with a sanitized ASCII `filename` as fallback.
pub fn content_disposition(object_name: &str) -> String {
    if object_name.chars().all(is_quotable) {
        return format!("attachment; filename=\"{}\"", object_name);
    }

    let fallback: String = object_name
        .chars()
        .map(|c| if is_quotable(c) { c } else { '_' })
        .collect();

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(object_name)
    )
}

fn is_quotable(c: char) -> bool {
    (' '..='~').contains(&c) && c != '"' && c != '\\'
}
