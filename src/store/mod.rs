//! Persistence: uploaded media blobs on disk and transcription records in
//! SQLite.

pub mod blob;
pub mod records;

pub use blob::BlobStore;
pub use records::{
    NewRecord, RecordPage, RecordStore, SearchQuery, StoreError, TranscriptionRecord,
    DEFAULT_PAGE_SIZE,
};
