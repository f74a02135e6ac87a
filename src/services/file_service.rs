//! FileService — create/read/delete of a file across the blob store and the
//! metadata store.
//!
//! Neither backend participates in a shared transaction, so every operation is
//! ordered so the only reachable half-state is an object with no record:
//!
//! - upload writes the object first, then inserts the record; if the insert
//!   fails the object is deleted once (compensation) before reporting failure.
//! - delete removes the object first, then the record; if the object delete
//!   fails the record is left untouched and the call can simply be retried.
//!
//! A compensation that itself fails is logged as a reconciliation gap. No step
//! is retried here.

use crate::models::file_record::{FileRecord, NewFileRecord};
use crate::services::{
    blob_store::{BlobStore, BlobStoreError},
    metadata_store::{MetadataError, MetadataStore},
};
use bytes::Bytes;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// A file as received from the client.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

#[derive(Debug, Error)]
pub enum FileServiceError {
    #[error("file `{0}` not found")]
    NotFound(String),
    #[error("file name cannot be stored: {0}")]
    InvalidFileName(#[source] BlobStoreError),
    #[error("storage write failed: {0}")]
    StorageWrite(#[source] BlobStoreError),
    #[error("metadata insert failed: {0}")]
    MetadataInsert(#[source] MetadataError),
    #[error("storage delete failed: {0}")]
    StorageDelete(#[source] BlobStoreError),
    #[error("metadata delete failed: {0}")]
    MetadataDelete(#[source] MetadataError),
}

pub type FileServiceResult<T> = Result<T, FileServiceError>;

#[derive(Clone)]
pub struct FileService {
    blobs: Arc<dyn BlobStore>,
    meta: Arc<dyn MetadataStore>,
}

impl FileService {
    pub fn new(blobs: Arc<dyn BlobStore>, meta: Arc<dyn MetadataStore>) -> Self {
        Self { blobs, meta }
    }

    /// Store a new file and its record.
    pub async fn upload(&self, upload: Upload) -> FileServiceResult<FileRecord> {
        let id = Uuid::new_v4();
        let new_record = NewFileRecord::new(id, upload.file_name, self.blobs.bucket());
        let key = new_record.file_key.clone();
        let content_type = upload
            .content_type
            .filter(|ct| !ct.is_empty())
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());
        let size_bytes = upload.data.len();

        match self.blobs.put(&key, upload.data, &content_type).await {
            Ok(()) => {}
            Err(err @ BlobStoreError::InvalidKey(_)) => {
                warn!(error = %err, key = %key, "file name refused by blob store");
                metrics::counter!("files.uploads", "outcome" => "invalid_name").increment(1);
                return Err(FileServiceError::InvalidFileName(err));
            }
            Err(err) => {
                error!(error = %err, key = %key, "blob write failed; nothing persisted");
                metrics::counter!("files.uploads", "outcome" => "storage_error").increment(1);
                return Err(FileServiceError::StorageWrite(err));
            }
        }

        match self.meta.create_file(new_record).await {
            Ok(record) => {
                info!(
                    id = %record.id,
                    key = %key,
                    size_bytes,
                    content_type = %content_type,
                    "file uploaded"
                );
                metrics::counter!("files.uploads", "outcome" => "ok").increment(1);
                Ok(record)
            }
            Err(err) => {
                error!(error = %err, key = %key, "metadata insert failed; compensating blob write");
                self.compensate_put(&key).await;
                metrics::counter!("files.uploads", "outcome" => "metadata_error").increment(1);
                Err(FileServiceError::MetadataInsert(err))
            }
        }
    }

    /// Single-attempt removal of an object whose record could not be written.
    async fn compensate_put(&self, key: &str) {
        match self.blobs.delete(key).await {
            Ok(()) => info!(key = %key, "compensating delete succeeded"),
            Err(err) => {
                error!(
                    error = %err,
                    key = %key,
                    bucket = %self.blobs.bucket(),
                    gap = "orphaned_object",
                    "reconciliation gap: compensating delete failed"
                );
                metrics::counter!("files.reconciliation_gaps", "kind" => "orphaned_object")
                    .increment(1);
            }
        }
    }

    /// Look up a record by its public id.
    ///
    /// Any lookup failure, including an id that is not a UUID and a store
    /// error, is reported as `NotFound`.
    pub async fn get(&self, id: &str) -> FileServiceResult<FileRecord> {
        let not_found = || FileServiceError::NotFound(id.to_string());
        let uuid = Uuid::parse_str(id).map_err(|_| not_found())?;

        match self.meta.find_file(uuid).await {
            Ok(Some(record)) => Ok(record),
            Ok(None) => Err(not_found()),
            Err(err) => {
                warn!(error = %err, id = %id, "metadata lookup failed; reporting not found");
                Err(not_found())
            }
        }
    }

    /// Remove the object, then the record.
    pub async fn delete(&self, id: &str) -> FileServiceResult<()> {
        let record = self.get(id).await?;

        if let Err(err) = self.blobs.delete(&record.file_key).await {
            error!(
                error = %err,
                id = %record.id,
                key = %record.file_key,
                "blob delete failed; record left intact"
            );
            metrics::counter!("files.deletes", "outcome" => "storage_error").increment(1);
            return Err(FileServiceError::StorageDelete(err));
        }

        match self.meta.destroy_file(record.id).await {
            Ok(()) => {
                info!(id = %record.id, key = %record.file_key, "file deleted");
                metrics::counter!("files.deletes", "outcome" => "ok").increment(1);
                Ok(())
            }
            Err(MetadataError::NotFound(_)) => {
                // Lost a race with a concurrent delete.
                Err(FileServiceError::NotFound(id.to_string()))
            }
            Err(err) => {
                error!(
                    error = %err,
                    id = %record.id,
                    key = %record.file_key,
                    gap = "record_without_object",
                    "reconciliation gap: object removed but record delete failed"
                );
                metrics::counter!("files.reconciliation_gaps", "kind" => "record_without_object")
                    .increment(1);
                metrics::counter!("files.deletes", "outcome" => "metadata_error").increment(1);
                Err(FileServiceError::MetadataDelete(err))
            }
        }
    }
}
