//! Metadata store: file records and liveness events.
//!
//! [`MetadataStore`] is the seam the saga and the probe depend on;
//! [`SqliteMetadataStore`] is the production implementation.

use crate::models::{
    file_record::{FileRecord, NewFileRecord},
    liveness_event::LivenessEvent,
};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("file record `{0}` not found")]
    NotFound(Uuid),
    #[error("file record `{0}` already exists")]
    Duplicate(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type MetadataResult<T> = Result<T, MetadataError>;

#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Insert a record; the store stamps `created_at`/`updated_at`.
    async fn create_file(&self, record: NewFileRecord) -> MetadataResult<FileRecord>;

    /// Exact lookup by id. A miss is `Ok(None)`.
    async fn find_file(&self, id: Uuid) -> MetadataResult<Option<FileRecord>>;

    /// Remove a record. Removing a record that is already gone is `NotFound`.
    async fn destroy_file(&self, id: Uuid) -> MetadataResult<()>;

    /// Append a liveness event stamped with the current time.
    async fn record_liveness(&self) -> MetadataResult<LivenessEvent>;
}

#[derive(Clone)]
pub struct SqliteMetadataStore {
    pub db: Arc<SqlitePool>,
}

impl SqliteMetadataStore {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MetadataStore for SqliteMetadataStore {
    async fn create_file(&self, record: NewFileRecord) -> MetadataResult<FileRecord> {
        let now = Utc::now();
        sqlx::query_as::<_, FileRecord>(
            r#"
            INSERT INTO file_metadata (id, file_name, file_key, url, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING id, file_name, file_key, url, created_at, updated_at
            "#,
        )
        .bind(record.id)
        .bind(&record.file_name)
        .bind(&record.file_key)
        .bind(&record.url)
        .bind(now)
        .bind(now)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                MetadataError::Duplicate(record.file_key.clone())
            } else {
                MetadataError::Sqlx(err)
            }
        })
    }

    async fn find_file(&self, id: Uuid) -> MetadataResult<Option<FileRecord>> {
        let record = sqlx::query_as::<_, FileRecord>(
            "SELECT id, file_name, file_key, url, created_at, updated_at
             FROM file_metadata WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&*self.db)
        .await?;
        Ok(record)
    }

    async fn destroy_file(&self, id: Uuid) -> MetadataResult<()> {
        let result = sqlx::query("DELETE FROM file_metadata WHERE id = ?")
            .bind(id)
            .execute(&*self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(MetadataError::NotFound(id));
        }
        Ok(())
    }

    async fn record_liveness(&self) -> MetadataResult<LivenessEvent> {
        let event = sqlx::query_as::<_, LivenessEvent>(
            "INSERT INTO health_check (datetime) VALUES (?) RETURNING check_id, datetime",
        )
        .bind(Utc::now())
        .fetch_one(&*self.db)
        .await?;
        Ok(event)
    }
}

/// Return true if the SQLx error is a unique constraint violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.message().to_ascii_lowercase().contains("unique")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    async fn store() -> SqliteMetadataStore {
        let pool = db::connect_in_memory().await.unwrap();
        db::run_migrations(&pool).await.unwrap();
        SqliteMetadataStore::new(Arc::new(pool))
    }

    #[tokio::test]
    async fn create_find_destroy() {
        let store = store().await;
        let id = Uuid::new_v4();

        let created = store
            .create_file(NewFileRecord::new(id, "cat.png", "bucket"))
            .await
            .unwrap();
        assert_eq!(created.id, id);
        assert_eq!(created.file_key, format!("{}/cat.png", id));
        assert_eq!(created.created_at, created.updated_at);

        let found = store.find_file(id).await.unwrap().unwrap();
        assert_eq!(found, created);

        store.destroy_file(id).await.unwrap();
        assert!(store.find_file(id).await.unwrap().is_none());
        assert!(matches!(
            store.destroy_file(id).await,
            Err(MetadataError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn duplicate_key_is_reported() {
        let store = store().await;
        let id = Uuid::new_v4();

        store
            .create_file(NewFileRecord::new(id, "a", "bucket"))
            .await
            .unwrap();
        let err = store
            .create_file(NewFileRecord::new(id, "a", "bucket"))
            .await
            .unwrap_err();
        assert!(matches!(err, MetadataError::Duplicate(_)));
    }

    #[tokio::test]
    async fn liveness_events_append() {
        let store = store().await;

        let first = store.record_liveness().await.unwrap();
        let second = store.record_liveness().await.unwrap();
        assert!(second.check_id > first.check_id);
        assert!(second.datetime >= first.datetime);
    }
}
