//! Represents the metadata row kept for every stored file.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Metadata for a single uploaded file.
///
/// A record exists only while its payload exists in the blob store under
/// `file_key`. The payload bytes themselves are never stored here.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq)]
pub struct FileRecord {
    /// Public handle, also the first segment of the storage key.
    pub id: Uuid,

    /// Original client-supplied file name, stored verbatim.
    pub file_name: String,

    /// Storage key, always `{id}/{file_name}`.
    pub file_key: String,

    /// `{bucket}/{file_key}`.
    pub url: String,

    /// Set by the metadata store at insert.
    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Fields the saga supplies when inserting a record. Timestamps are owned by
/// the store.
#[derive(Clone, Debug)]
pub struct NewFileRecord {
    pub id: Uuid,
    pub file_name: String,
    pub file_key: String,
    pub url: String,
}

impl NewFileRecord {
    /// Derive the storage key and url for a freshly generated id.
    pub fn new(id: Uuid, file_name: impl Into<String>, bucket: &str) -> Self {
        let file_name = file_name.into();
        let file_key = storage_key(id, &file_name);
        let url = format!("{}/{}", bucket, file_key);
        Self {
            id,
            file_name,
            file_key,
            url,
        }
    }
}

/// Compose the blob-store key for a file.
pub fn storage_key(id: Uuid, file_name: &str) -> String {
    format!("{}/{}", id, file_name)
}

/// JSON body returned by upload and read.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct FileResponse {
    pub id: Uuid,
    pub file_name: String,
    pub url: String,
    pub upload_date: String,
}

impl From<FileRecord> for FileResponse {
    fn from(record: FileRecord) -> Self {
        Self {
            id: record.id,
            file_name: record.file_name,
            url: record.url,
            upload_date: record
                .created_at
                .to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}
