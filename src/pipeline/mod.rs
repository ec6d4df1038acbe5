//! Ingestion pipeline: accept an upload, transcribe it, enrich the
//! transcript, persist the result.

pub mod ingest;

pub use ingest::{IngestError, IngestOutcome, IngestPipeline, IngestRequest, UploadedFile};
