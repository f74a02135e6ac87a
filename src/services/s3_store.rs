//! S3 blob store backed by the `object_store` crate.

use super::blob_store::{BlobResult, BlobStore, BlobStoreError};
use async_trait::async_trait;
use bytes::Bytes;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path;
use object_store::{
    Attribute, AttributeValue, Attributes, ObjectStore, ObjectStoreExt, PutOptions, PutPayload,
};
use std::sync::Arc;
use std::time::Instant;

#[derive(Clone, Debug)]
pub struct S3BlobStore {
    store: Arc<dyn ObjectStore>,
    bucket: String,
}

impl S3BlobStore {
    /// Build a client from the ambient AWS environment plus explicit
    /// bucket/region. `endpoint_url` targets S3-compatible providers such as
    /// MinIO (`http://localhost:9000`).
    pub fn new(bucket: String, region: String, endpoint_url: Option<String>) -> BlobResult<Self> {
        let mut builder = AmazonS3Builder::from_env()
            .with_region(region)
            .with_bucket_name(bucket.clone());

        if let Some(endpoint) = endpoint_url {
            let allow_http = endpoint.starts_with("http://");
            builder = builder.with_endpoint(endpoint).with_allow_http(allow_http);
        }

        let store = builder
            .build()
            .map_err(|e| BlobStoreError::Config(e.to_string()))?;

        Ok(Self::with_store(Arc::new(store), bucket))
    }

    /// Wrap an already configured store, e.g. `object_store::memory::InMemory`.
    pub fn with_store(store: Arc<dyn ObjectStore>, bucket: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
        }
    }

    /// Map a storage key to an object location without rewriting it.
    ///
    /// `Path::from` percent-encodes characters such as `#` or `%` and drops
    /// empty segments, so the object would land somewhere other than the key
    /// recorded in the metadata row. Keys that do not survive verbatim are
    /// refused.
    pub fn object_location(key: &str) -> BlobResult<Path> {
        let location = Path::parse(key).map_err(|_| BlobStoreError::InvalidKey(key.to_string()))?;
        if location.as_ref() != key {
            return Err(BlobStoreError::InvalidKey(key.to_string()));
        }
        Ok(location)
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> BlobResult<()> {
        let start = Instant::now();
        let size_bytes = data.len();
        let location = Self::object_location(key)?;

        let mut attributes = Attributes::new();
        attributes.insert(
            Attribute::ContentType,
            AttributeValue::from(content_type.to_string()),
        );
        let opts = PutOptions {
            attributes,
            ..Default::default()
        };

        self.store
            .put_opts(&location, PutPayload::from(data), opts)
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    size_bytes,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 upload failed"
                );
                BlobStoreError::PutFailed {
                    key: key.to_string(),
                    reason: e.to_string(),
                }
            })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> BlobResult<()> {
        let start = Instant::now();
        let location = Self::object_location(key)?;

        self.store.delete(&location).await.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %key,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 delete failed"
            );
            BlobStoreError::DeleteFailed {
                key: key.to_string(),
                reason: e.to_string(),
            }
        })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 delete successful"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::file_record::NewFileRecord;
    use object_store::memory::InMemory;
    use uuid::Uuid;

    fn in_memory_store() -> (S3BlobStore, Arc<InMemory>) {
        let inner = Arc::new(InMemory::new());
        (S3BlobStore::with_store(inner.clone(), "test-bucket"), inner)
    }

    #[tokio::test]
    async fn object_is_stored_under_the_recorded_key() {
        let (store, inner) = in_memory_store();
        let record = NewFileRecord::new(Uuid::new_v4(), "report#1.pdf", store.bucket());

        store
            .put(&record.file_key, Bytes::from_static(b"%PDF"), "application/pdf")
            .await
            .unwrap();

        let location = Path::parse(&record.file_key).unwrap();
        let meta = inner.head(&location).await.unwrap();
        assert_eq!(meta.location.as_ref(), record.file_key);

        let got = inner.get(&location).await.unwrap();
        assert_eq!(
            got.attributes.get(&Attribute::ContentType),
            Some(&AttributeValue::from("application/pdf"))
        );
        assert_eq!(got.bytes().await.unwrap(), Bytes::from_static(b"%PDF"));
    }

    #[tokio::test]
    async fn percent_and_brackets_survive_verbatim() {
        let (store, inner) = in_memory_store();
        let record = NewFileRecord::new(Uuid::new_v4(), "50% off [v2].png", store.bucket());

        store
            .put(&record.file_key, Bytes::from_static(b"png"), "image/png")
            .await
            .unwrap();

        let meta = inner
            .head(&Path::parse(&record.file_key).unwrap())
            .await
            .unwrap();
        assert_eq!(meta.location.as_ref(), record.file_key);

        store.delete(&record.file_key).await.unwrap();
        assert!(
            inner
                .head(&Path::parse(&record.file_key).unwrap())
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn keys_that_would_be_rewritten_are_refused() {
        let (store, _inner) = in_memory_store();
        let id = Uuid::new_v4();

        for name in ["..", "a//b", "trailing/", "bell\u{7}"] {
            let key = format!("{}/{}", id, name);
            let err = store
                .put(&key, Bytes::from_static(b"x"), "text/plain")
                .await
                .unwrap_err();
            assert!(matches!(err, BlobStoreError::InvalidKey(_)), "{name:?}");
        }
    }

    #[tokio::test]
    async fn deleting_an_absent_key_succeeds() {
        let (store, _inner) = in_memory_store();

        store
            .delete(&format!("{}/missing.txt", Uuid::new_v4()))
            .await
            .unwrap();
    }
}
