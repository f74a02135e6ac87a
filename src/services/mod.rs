//! Core services and the collaborator seams they depend on.

pub mod blob_store;
pub mod file_service;
pub mod local_store;
pub mod metadata_store;
pub mod probe;
pub mod s3_store;
