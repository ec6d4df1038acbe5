use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::clients::{ClientError, EnrichmentBackend, EnrichmentRequest, TranscriptionBackend};
use crate::store::{BlobStore, NewRecord, RecordStore, StoreError, TranscriptionRecord};

/// An uploaded media file as received from the client.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub bytes: Vec<u8>,
    pub original_name: String,
    pub mime_type: String,
}

/// One ingestion request: the file plus whatever metadata the user chose to
/// supply.
#[derive(Debug, Clone)]
pub struct IngestRequest {
    pub file: UploadedFile,
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Result of a completed run: the raw transcript, the text to display, and
/// the persisted record.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub text: String,
    pub formatted_text: String,
    pub record: TranscriptionRecord,
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("No file provided")]
    MissingFile,

    #[error("OpenAI API Key not configured")]
    MissingCredentials,

    #[error("failed to store uploaded file: {0}")]
    Blob(#[from] std::io::Error),

    #[error("transcription failed: {0}")]
    Transcription(#[source] ClientError),

    #[error("transcription returned no text")]
    EmptyTranscript,

    #[error("failed to persist transcription: {0}")]
    Storage(#[from] StoreError),
}

/// Orchestrates one upload end to end.
///
/// Stages run strictly in order with no retries: validate, write the blob,
/// transcribe, enrich, merge, persist. Transcription failures abort the run;
/// enrichment failures never do. When enrichment degrades the record still
/// carries the raw transcript as its formatted text, so a successful run
/// always yields displayable output.
pub struct IngestPipeline {
    blobs: BlobStore,
    records: RecordStore,
    transcriber: Arc<dyn TranscriptionBackend>,
    enricher: Arc<dyn EnrichmentBackend>,
}

impl IngestPipeline {
    pub fn new(
        blobs: BlobStore,
        records: RecordStore,
        transcriber: Arc<dyn TranscriptionBackend>,
        enricher: Arc<dyn EnrichmentBackend>,
    ) -> Self {
        Self {
            blobs,
            records,
            transcriber,
            enricher,
        }
    }

    pub async fn ingest(&self, request: IngestRequest) -> Result<IngestOutcome, IngestError> {
        let IngestRequest {
            file,
            name,
            description,
        } = request;

        if file.bytes.is_empty() {
            return Err(IngestError::MissingFile);
        }
        if !self.transcriber.is_configured() || !self.enricher.is_configured() {
            return Err(IngestError::MissingCredentials);
        }

        let filename = self.blobs.save(&file.original_name, &file.bytes).await?;

        let transcript = self
            .transcriber
            .transcribe(&file.original_name, &file.mime_type, file.bytes)
            .await
            .map_err(IngestError::Transcription)?;
        if transcript.trim().is_empty() {
            return Err(IngestError::EmptyTranscript);
        }

        info!(file = %filename, chars = transcript.len(), "Transcription complete");

        // Best-effort: any enrichment failure degrades to the raw transcript
        // and leaves user metadata untouched.
        let enrichment = match self
            .enricher
            .enrich(&EnrichmentRequest {
                transcript: transcript.clone(),
                name: name.clone(),
                description: description.clone(),
            })
            .await
        {
            Ok(enrichment) => enrichment,
            Err(err) => {
                warn!("Enrichment failed, falling back to raw transcript: {err}");
                Default::default()
            }
        };

        // User-supplied metadata always wins; generated values only fill gaps.
        let formatted_text = enrichment
            .formatted_text
            .unwrap_or_else(|| transcript.clone());
        let name = name.or(enrichment.generated_title);
        let description = description.or(enrichment.generated_description);

        let record = self.records.insert(NewRecord {
            filename,
            original_name: file.original_name,
            name,
            description,
            text: transcript.clone(),
            formatted_text: Some(formatted_text.clone()),
        })?;

        info!(id = %record.id, "Transcription stored");

        Ok(IngestOutcome {
            text: transcript,
            formatted_text,
            record,
        })
    }
}
