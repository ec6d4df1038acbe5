pub mod clients;
pub mod config;
pub mod http;
pub mod pipeline;
pub mod store;

pub use clients::{EnrichmentBackend, OpenAiClient, TranscriptionBackend};
pub use config::Config;
pub use http::{create_router, AppState};
pub use pipeline::{IngestError, IngestOutcome, IngestPipeline, IngestRequest, UploadedFile};
pub use store::{BlobStore, RecordPage, RecordStore, SearchQuery, StoreError, TranscriptionRecord};
