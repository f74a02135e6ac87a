//! Blob store abstraction.
//!
//! The saga only needs to write and remove whole objects by key, so the trait
//! is deliberately narrow. Backends: [`LocalBlobStore`](super::local_store::LocalBlobStore)
//! and [`S3BlobStore`](super::s3_store::S3BlobStore).

use async_trait::async_trait;
use bytes::Bytes;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BlobStoreError {
    #[error("invalid storage key `{0}`")]
    InvalidKey(String),
    #[error("put failed for `{key}`: {reason}")]
    PutFailed { key: String, reason: String },
    #[error("delete failed for `{key}`: {reason}")]
    DeleteFailed { key: String, reason: String },
    #[error("blob store misconfigured: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type BlobResult<T> = Result<T, BlobStoreError>;

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Bucket or container name, used to build public locators.
    fn bucket(&self) -> &str;

    /// Write `data` under `key`, replacing anything already there.
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> BlobResult<()>;

    /// Remove the object under `key`. Removing an absent key succeeds.
    async fn delete(&self, key: &str) -> BlobResult<()>;
}
