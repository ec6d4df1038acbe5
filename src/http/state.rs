use std::path::PathBuf;
use std::sync::Arc;

use crate::pipeline::IngestPipeline;
use crate::store::RecordStore;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Upload ingestion pipeline
    pub pipeline: Arc<IngestPipeline>,

    /// Record store for history queries and deletion
    pub records: RecordStore,

    /// Directory of stored media blobs, served under /uploads
    pub uploads_dir: PathBuf,
}

impl AppState {
    pub fn new(pipeline: Arc<IngestPipeline>, records: RecordStore, uploads_dir: PathBuf) -> Self {
        Self {
            pipeline,
            records,
            uploads_dir,
        }
    }
}
