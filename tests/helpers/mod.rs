//! Shared test fixtures: in-process server, a recording blob store and a
//! metadata store with switchable failures.

#![allow(dead_code)]

use async_trait::async_trait;
use axum_test::TestServer;
use bytes::Bytes;
use file_vault::{
    db,
    models::{
        file_record::{FileRecord, NewFileRecord},
        liveness_event::LivenessEvent,
    },
    routes::routes::app,
    services::{
        blob_store::{BlobResult, BlobStore, BlobStoreError},
        metadata_store::{MetadataError, MetadataResult, MetadataStore, SqliteMetadataStore},
    },
    state::AppState,
};
use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
};
use uuid::Uuid;

pub const TEST_BUCKET: &str = "test-bucket";
pub const TEST_UPLOAD_LIMIT: usize = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlobCall {
    Put { key: String, content_type: String },
    Delete { key: String },
}

/// Blob store kept in memory. Records every call, including failed ones.
#[derive(Default)]
pub struct FakeBlobStore {
    pub objects: Mutex<HashMap<String, Bytes>>,
    pub calls: Mutex<Vec<BlobCall>>,
    pub fail_put: AtomicBool,
    pub fail_delete: AtomicBool,
}

impl FakeBlobStore {
    pub fn calls(&self) -> Vec<BlobCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }

    pub fn object_count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }
}

#[async_trait]
impl BlobStore for FakeBlobStore {
    fn bucket(&self) -> &str {
        TEST_BUCKET
    }

    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> BlobResult<()> {
        self.calls.lock().unwrap().push(BlobCall::Put {
            key: key.to_string(),
            content_type: content_type.to_string(),
        });
        if self.fail_put.load(Ordering::SeqCst) {
            return Err(BlobStoreError::PutFailed {
                key: key.to_string(),
                reason: "injected put failure".into(),
            });
        }
        self.objects.lock().unwrap().insert(key.to_string(), data);
        Ok(())
    }

    async fn delete(&self, key: &str) -> BlobResult<()> {
        self.calls.lock().unwrap().push(BlobCall::Delete {
            key: key.to_string(),
        });
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(BlobStoreError::DeleteFailed {
                key: key.to_string(),
                reason: "injected delete failure".into(),
            });
        }
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }
}

/// Real SQLite store (in memory) with failure switches in front of it.
pub struct FlakyMetadataStore {
    pub inner: SqliteMetadataStore,
    pub fail_create: AtomicBool,
    pub fail_find: AtomicBool,
    pub fail_destroy: AtomicBool,
    pub fail_liveness: AtomicBool,
}

impl FlakyMetadataStore {
    pub async fn new() -> Self {
        let pool = db::connect_in_memory().await.expect("in-memory sqlite");
        db::run_migrations(&pool).await.expect("migrations");
        Self {
            inner: SqliteMetadataStore::new(Arc::new(pool)),
            fail_create: AtomicBool::new(false),
            fail_find: AtomicBool::new(false),
            fail_destroy: AtomicBool::new(false),
            fail_liveness: AtomicBool::new(false),
        }
    }

    pub async fn file_count(&self) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM file_metadata")
            .fetch_one(&*self.inner.db)
            .await
            .expect("count files")
    }

    pub async fn liveness_count(&self) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM health_check")
            .fetch_one(&*self.inner.db)
            .await
            .expect("count liveness events")
    }
}

/// What a saturated or unreachable pool reports.
fn injected() -> MetadataError {
    MetadataError::Sqlx(sqlx::Error::PoolTimedOut)
}

#[async_trait]
impl MetadataStore for FlakyMetadataStore {
    async fn create_file(&self, record: NewFileRecord) -> MetadataResult<FileRecord> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(injected());
        }
        self.inner.create_file(record).await
    }

    async fn find_file(&self, id: Uuid) -> MetadataResult<Option<FileRecord>> {
        if self.fail_find.load(Ordering::SeqCst) {
            return Err(injected());
        }
        self.inner.find_file(id).await
    }

    async fn destroy_file(&self, id: Uuid) -> MetadataResult<()> {
        if self.fail_destroy.load(Ordering::SeqCst) {
            return Err(injected());
        }
        self.inner.destroy_file(id).await
    }

    async fn record_liveness(&self) -> MetadataResult<LivenessEvent> {
        if self.fail_liveness.load(Ordering::SeqCst) {
            return Err(injected());
        }
        self.inner.record_liveness().await
    }
}

/// Server wired to the fakes, with handles to inspect and break them.
pub struct TestApp {
    pub server: TestServer,
    pub blobs: Arc<FakeBlobStore>,
    pub meta: Arc<FlakyMetadataStore>,
}

pub async fn setup_test_app() -> TestApp {
    let blobs = Arc::new(FakeBlobStore::default());
    let meta = Arc::new(FlakyMetadataStore::new().await);
    let state = AppState::new(blobs.clone(), meta.clone());
    let server =
        TestServer::new(app(state, TEST_UPLOAD_LIMIT)).expect("Failed to create test server");

    TestApp {
        server,
        blobs,
        meta,
    }
}
