//! Local-disk blob store.
//!
//! Payloads live under `base_path/{bucket}/{shard}/{shard}/{key}` where the
//! two shard levels come from MD5(bucket/key). Writes go to a temp file that
//! is fsynced and renamed into place, so a crashed write never leaves a
//! half-written object at the final path.

use super::blob_store::{BlobResult, BlobStore, BlobStoreError};
use async_trait::async_trait;
use bytes::Bytes;
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::debug;
use uuid::Uuid;

const MAX_KEY_LEN: usize = 1024;

#[derive(Clone, Debug)]
pub struct LocalBlobStore {
    base_path: PathBuf,
    bucket: String,
}

impl LocalBlobStore {
    pub fn new(base_path: impl Into<PathBuf>, bucket: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            bucket: bucket.into(),
        }
    }

    /// Create the bucket root if it does not exist yet.
    pub async fn ensure_root(&self) -> BlobResult<()> {
        fs::create_dir_all(self.bucket_root()).await?;
        Ok(())
    }

    /// Reject keys that could escape the bucket directory.
    ///
    /// Keys are `{uuid}/{client file name}`, so the file name half is
    /// untrusted input.
    fn ensure_key_safe(key: &str) -> BlobResult<()> {
        let bad = key.is_empty()
            || key.len() > MAX_KEY_LEN
            || key.starts_with('/')
            || key.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..")
            || key
                .bytes()
                .any(|b| b.is_ascii_control() || b == b'\\' || b == b'\0');
        if bad {
            return Err(BlobStoreError::InvalidKey(key.to_string()));
        }
        Ok(())
    }

    fn bucket_root(&self) -> PathBuf {
        self.base_path.join(&self.bucket)
    }

    /// Two-level shard directories from the first two bytes of MD5(bucket/key).
    fn object_shards(bucket: &str, key: &str) -> (String, String) {
        let digest = md5::compute(format!("{}/{}", bucket, key));
        (format!("{:02x}", digest[0]), format!("{:02x}", digest[1]))
    }

    /// Full payload path for `key`. Parent directories may not exist yet.
    pub fn object_path(&self, key: &str) -> PathBuf {
        let (shard_a, shard_b) = Self::object_shards(&self.bucket, key);
        let mut path = self.bucket_root();
        path.push(shard_a);
        path.push(shard_b);
        path.push(key);
        path
    }

    /// Remove now-empty directories from `start` up to (not including) `stop`.
    async fn prune_empty_dirs(&self, start: &Path, stop: &Path) {
        let mut current = start.to_path_buf();
        while current.starts_with(stop) && current != stop {
            match fs::remove_dir(&current).await {
                Ok(_) => match current.parent() {
                    Some(parent) => current = parent.to_path_buf(),
                    None => break,
                },
                Err(err) if err.kind() == ErrorKind::NotFound => break,
                Err(err) if err.kind() == ErrorKind::DirectoryNotEmpty => break,
                Err(err) => {
                    debug!("failed to prune directory {}: {}", current.display(), err);
                    break;
                }
            }
        }
    }

    async fn write_atomically(&self, file_path: &Path, data: &[u8]) -> io::Result<()> {
        let parent = file_path
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| io::Error::other("object path missing parent directory"))?;
        fs::create_dir_all(&parent).await?;

        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));
        let result = async {
            let mut file = File::create(&tmp_path).await?;
            file.write_all(data).await?;
            file.flush().await?;
            file.sync_all().await?;
            fs::rename(&tmp_path, file_path).await
        }
        .await;

        if result.is_err() {
            let _ = fs::remove_file(&tmp_path).await;
        }
        result
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> BlobResult<()> {
        Self::ensure_key_safe(key)?;
        let file_path = self.object_path(key);
        let size_bytes = data.len();

        self.write_atomically(&file_path, &data)
            .await
            .map_err(|err| BlobStoreError::PutFailed {
                key: key.to_string(),
                reason: err.to_string(),
            })?;

        debug!(
            key = %key,
            size_bytes,
            content_type = %content_type,
            "wrote object to {}",
            file_path.display()
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> BlobResult<()> {
        Self::ensure_key_safe(key)?;
        let file_path = self.object_path(key);

        match fs::remove_file(&file_path).await {
            Ok(_) => debug!("removed physical file {}", file_path.display()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("file {} already missing", file_path.display());
            }
            Err(err) => {
                return Err(BlobStoreError::DeleteFailed {
                    key: key.to_string(),
                    reason: err.to_string(),
                });
            }
        }

        if let Some(parent) = file_path.parent() {
            self.prune_empty_dirs(parent, &self.bucket_root()).await;
        }
        Ok(())
    }
}
