//! HTTP handlers for the file API.
//!
//! - `POST   /v1/file`      upload (multipart, field `profilePic`)
//! - `GET    /v1/file/{id}` read metadata
//! - `DELETE /v1/file/{id}` delete object and metadata
//!
//! Storage and consistency concerns live in `FileService`.

use crate::{
    errors::AppError,
    models::file_record::FileResponse,
    services::file_service::Upload,
    state::AppState,
};
use axum::{
    Json,
    extract::{
        Multipart, Path, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::StatusCode,
};

/// Multipart field carrying the file. `file` is accepted as an alias.
pub const FILE_FIELD: &str = "profilePic";
const FILE_FIELD_ALIAS: &str = "file";

const NO_FILE_MESSAGE: &str = "No file in request (profilePic).";

/// `POST /v1/file`
pub async fn upload_file(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<FileResponse>), AppError> {
    let multipart = multipart.map_err(|_| AppError::bad_request(NO_FILE_MESSAGE))?;
    let upload = extract_upload(multipart)
        .await?
        .ok_or_else(|| AppError::bad_request(NO_FILE_MESSAGE))?;

    let record = state.files.upload(upload).await?;
    Ok((StatusCode::CREATED, Json(record.into())))
}

/// Pull the first file part out of the form. Text fields and parts under
/// other names are skipped.
async fn extract_upload(mut multipart: Multipart) -> Result<Option<Upload>, AppError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let is_file_field = matches!(field.name(), Some(FILE_FIELD | FILE_FIELD_ALIAS));
        let file_name = match field.file_name() {
            Some(name) if is_file_field && !name.is_empty() => name.to_string(),
            _ => continue,
        };
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.map_err(multipart_error)?;

        return Ok(Some(Upload {
            file_name,
            content_type,
            data,
        }));
    }
    Ok(None)
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::new(StatusCode::PAYLOAD_TOO_LARGE, "File too large")
    } else {
        tracing::debug!(error = %err, "malformed multipart body");
        AppError::bad_request(NO_FILE_MESSAGE)
    }
}

/// `GET /v1/file/{id}`
pub async fn get_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<FileResponse>, AppError> {
    let record = state.files.get(&id).await?;
    Ok(Json(record.into()))
}

/// `DELETE /v1/file/{id}`
pub async fn delete_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.files.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Verbs without meaning on the collection.
pub async fn collection_bad_request() -> AppError {
    AppError::bad_request("Bad Request")
}

/// Verbs without meaning on a single file, HEAD included.
pub async fn item_method_not_allowed() -> AppError {
    AppError::method_not_allowed()
}
