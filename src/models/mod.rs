//! Data models for the file metadata store.
//!
//! Both entities map to SQLite tables via `sqlx::FromRow` and serialize
//! as JSON via `serde`.

pub mod file_record;
pub mod liveness_event;
