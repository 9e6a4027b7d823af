/// Content type used when neither the client nor the file extension tells us
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Multipart form field carrying the uploaded file
pub const UPLOAD_FIELD_NAME: &str = "file";
