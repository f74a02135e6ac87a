use crate::services::file_service::FileServiceError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// HTTP-facing error: a status plus a short client-safe message.
///
/// Rendered as `{"error": message}`. Backend error text never reaches the
/// message; it is logged where the failure happens.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// Shortcut for 404 Not Found
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    pub fn method_not_allowed() -> Self {
        Self::new(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed")
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<FileServiceError> for AppError {
    fn from(err: FileServiceError) -> Self {
        match err {
            FileServiceError::NotFound(_) => AppError::not_found("File not found"),
            FileServiceError::InvalidFileName(_) => AppError::bad_request("Invalid file name"),
            FileServiceError::StorageWrite(_) => AppError::internal("S3 Upload Failed"),
            FileServiceError::MetadataInsert(_) => AppError::internal("DB Record Creation Failed"),
            FileServiceError::StorageDelete(_) => {
                AppError::internal("Failed to delete file from S3")
            }
            FileServiceError::MetadataDelete(_) => AppError::internal("Internal Server Error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::blob_store::BlobStoreError;

    #[test]
    fn saga_errors_map_to_fixed_messages() {
        let err: AppError = FileServiceError::StorageWrite(BlobStoreError::PutFailed {
            key: "k".into(),
            reason: "secret backend detail".into(),
        })
        .into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "S3 Upload Failed");

        let err: AppError =
            FileServiceError::InvalidFileName(BlobStoreError::InvalidKey("id/..".into())).into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "Invalid file name");

        let err: AppError = FileServiceError::NotFound("abc".into()).into();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.message, "File not found");
    }
}
