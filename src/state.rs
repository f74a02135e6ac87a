use crate::services::{
    blob_store::BlobStore, file_service::FileService, metadata_store::MetadataStore,
    probe::ProbeService,
};
use std::sync::Arc;

/// Shared handler state. Both services are cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub files: FileService,
    pub probe: ProbeService,
}

impl AppState {
    pub fn new(blobs: Arc<dyn BlobStore>, meta: Arc<dyn MetadataStore>) -> Self {
        Self {
            files: FileService::new(blobs, meta.clone()),
            probe: ProbeService::new(meta),
        }
    }
}
