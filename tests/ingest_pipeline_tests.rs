// Integration tests for the ingestion pipeline
//
// These tests drive uploads end to end against mock capability backends,
// covering the enrichment fallback and the metadata merge rules.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use scriba::clients::{
    ClientError, Enrichment, EnrichmentBackend, EnrichmentRequest, TranscriptionBackend,
};
use scriba::pipeline::{IngestError, IngestPipeline, IngestRequest, UploadedFile};
use scriba::store::{BlobStore, RecordStore, SearchQuery};
use tempfile::TempDir;

struct FixedTranscriber {
    reply: Option<String>,
    configured: bool,
}

impl FixedTranscriber {
    fn text(text: &str) -> Self {
        Self {
            reply: Some(text.to_string()),
            configured: true,
        }
    }

    fn failing() -> Self {
        Self {
            reply: None,
            configured: true,
        }
    }

    fn unconfigured() -> Self {
        Self {
            reply: Some("never reached".to_string()),
            configured: false,
        }
    }
}

#[async_trait]
impl TranscriptionBackend for FixedTranscriber {
    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn transcribe(
        &self,
        _file_name: &str,
        _mime_type: &str,
        _bytes: Vec<u8>,
    ) -> Result<String, ClientError> {
        match &self.reply {
            Some(text) => Ok(text.clone()),
            None => Err(ClientError::Api {
                status: 500,
                body: "speech service offline".to_string(),
            }),
        }
    }
}

struct FixedEnricher {
    reply: Option<Enrichment>,
    configured: bool,
}

impl FixedEnricher {
    fn replying(reply: Enrichment) -> Self {
        Self {
            reply: Some(reply),
            configured: true,
        }
    }

    fn failing() -> Self {
        Self {
            reply: None,
            configured: true,
        }
    }

    fn unconfigured() -> Self {
        Self {
            reply: Some(Enrichment::default()),
            configured: false,
        }
    }
}

#[async_trait]
impl EnrichmentBackend for FixedEnricher {
    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn enrich(&self, _request: &EnrichmentRequest) -> Result<Enrichment, ClientError> {
        match &self.reply {
            Some(reply) => Ok(reply.clone()),
            None => Err(ClientError::Api {
                status: 503,
                body: "model unavailable".to_string(),
            }),
        }
    }
}

fn pipeline_with(
    temp: &TempDir,
    transcriber: FixedTranscriber,
    enricher: FixedEnricher,
) -> Result<(IngestPipeline, RecordStore)> {
    let records = RecordStore::open_in_memory()?;
    let blobs = BlobStore::new(temp.path().join("uploads"));
    let pipeline = IngestPipeline::new(
        blobs,
        records.clone(),
        Arc::new(transcriber),
        Arc::new(enricher),
    );
    Ok((pipeline, records))
}

fn upload(name: Option<&str>, description: Option<&str>) -> IngestRequest {
    IngestRequest {
        file: UploadedFile {
            bytes: b"RIFF fake wav payload".to_vec(),
            original_name: "standup recording.wav".to_string(),
            mime_type: "audio/wav".to_string(),
        },
        name: name.map(str::to_string),
        description: description.map(str::to_string),
    }
}

#[tokio::test]
async fn test_ingest_persists_enriched_record() -> Result<()> {
    let temp = TempDir::new()?;
    let (pipeline, records) = pipeline_with(
        &temp,
        FixedTranscriber::text("hello world"),
        FixedEnricher::replying(Enrichment {
            formatted_text: Some("## Standup\n\nHello world.".to_string()),
            generated_title: Some("Standup".to_string()),
            generated_description: Some("A quick sync.".to_string()),
        }),
    )?;

    let outcome = pipeline.ingest(upload(None, None)).await?;

    assert_eq!(outcome.text, "hello world");
    assert_eq!(outcome.formatted_text, "## Standup\n\nHello world.");

    let record = &outcome.record;
    assert_eq!(record.name.as_deref(), Some("Standup"));
    assert_eq!(record.description.as_deref(), Some("A quick sync."));
    assert_eq!(record.text, "hello world");
    assert_eq!(record.formatted_text.as_deref(), Some("## Standup\n\nHello world."));

    // The stored filename is generated, never the client's own name
    assert_ne!(record.filename, record.original_name);
    assert!(record.filename.ends_with("standup_recording.wav"));

    // Blob written verbatim under the uploads root
    let blob = std::fs::read(temp.path().join("uploads").join(&record.filename))?;
    assert_eq!(blob, b"RIFF fake wav payload");

    // Exactly one record persisted
    let page = records.search(&SearchQuery::new("", None, None))?;
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].id, record.id);

    Ok(())
}

#[tokio::test]
async fn test_ingest_user_metadata_wins_over_generated() -> Result<()> {
    let temp = TempDir::new()?;
    let (pipeline, _records) = pipeline_with(
        &temp,
        FixedTranscriber::text("hello world"),
        FixedEnricher::replying(Enrichment {
            formatted_text: Some("formatted".to_string()),
            generated_title: Some("Generated title".to_string()),
            generated_description: Some("Generated description".to_string()),
        }),
    )?;

    let outcome = pipeline
        .ingest(upload(Some("My title"), Some("My description")))
        .await?;

    assert_eq!(outcome.record.name.as_deref(), Some("My title"));
    assert_eq!(outcome.record.description.as_deref(), Some("My description"));

    Ok(())
}

#[tokio::test]
async fn test_ingest_generated_metadata_fills_gaps_only() -> Result<()> {
    let temp = TempDir::new()?;
    let (pipeline, _records) = pipeline_with(
        &temp,
        FixedTranscriber::text("hello world"),
        FixedEnricher::replying(Enrichment {
            formatted_text: Some("formatted".to_string()),
            generated_title: Some("Generated title".to_string()),
            generated_description: Some("Generated description".to_string()),
        }),
    )?;

    // User supplied only a title; the description gap is filled
    let outcome = pipeline.ingest(upload(Some("My title"), None)).await?;

    assert_eq!(outcome.record.name.as_deref(), Some("My title"));
    assert_eq!(
        outcome.record.description.as_deref(),
        Some("Generated description")
    );

    Ok(())
}

#[tokio::test]
async fn test_ingest_degrades_to_raw_transcript_when_enricher_fails() -> Result<()> {
    let temp = TempDir::new()?;
    let (pipeline, records) = pipeline_with(
        &temp,
        FixedTranscriber::text("hello world"),
        FixedEnricher::failing(),
    )?;

    let outcome = pipeline.ingest(upload(Some("Standup"), None)).await?;

    // A failed enrichment never fails the upload and never touches the
    // metadata the user supplied
    assert_eq!(outcome.text, "hello world");
    assert_eq!(outcome.formatted_text, "hello world");
    assert_eq!(outcome.record.name.as_deref(), Some("Standup"));
    assert_eq!(outcome.record.description, None);
    assert_eq!(outcome.record.text, "hello world");
    assert_eq!(outcome.record.formatted_text.as_deref(), Some("hello world"));

    let page = records.search(&SearchQuery::new("", None, None))?;
    assert_eq!(page.total, 1);

    Ok(())
}

#[tokio::test]
async fn test_ingest_degrades_when_enricher_reply_is_empty() -> Result<()> {
    let temp = TempDir::new()?;
    let (pipeline, _records) = pipeline_with(
        &temp,
        FixedTranscriber::text("hello world"),
        FixedEnricher::replying(Enrichment::default()),
    )?;

    let outcome = pipeline.ingest(upload(None, None)).await?;

    assert_eq!(outcome.formatted_text, "hello world");
    assert_eq!(outcome.record.name, None);

    Ok(())
}

#[tokio::test]
async fn test_ingest_rejects_empty_upload() -> Result<()> {
    let temp = TempDir::new()?;
    let (pipeline, records) = pipeline_with(
        &temp,
        FixedTranscriber::text("hello world"),
        FixedEnricher::failing(),
    )?;

    let mut request = upload(None, None);
    request.file.bytes.clear();

    let err = pipeline.ingest(request).await.unwrap_err();
    assert!(matches!(err, IngestError::MissingFile));

    let page = records.search(&SearchQuery::new("", None, None))?;
    assert_eq!(page.total, 0);

    Ok(())
}

#[tokio::test]
async fn test_ingest_requires_configured_backends() -> Result<()> {
    let temp = TempDir::new()?;
    let (pipeline, records) = pipeline_with(
        &temp,
        FixedTranscriber::unconfigured(),
        FixedEnricher::replying(Enrichment::default()),
    )?;

    let err = pipeline.ingest(upload(None, None)).await.unwrap_err();
    assert!(matches!(err, IngestError::MissingCredentials));

    let page = records.search(&SearchQuery::new("", None, None))?;
    assert_eq!(page.total, 0);

    // An unconfigured enricher is rejected the same way, before any work
    let temp = TempDir::new()?;
    let (pipeline, records) = pipeline_with(
        &temp,
        FixedTranscriber::text("hello world"),
        FixedEnricher::unconfigured(),
    )?;

    let err = pipeline.ingest(upload(None, None)).await.unwrap_err();
    assert!(matches!(err, IngestError::MissingCredentials));

    let page = records.search(&SearchQuery::new("", None, None))?;
    assert_eq!(page.total, 0);

    Ok(())
}

#[tokio::test]
async fn test_ingest_transcription_failure_aborts_without_record() -> Result<()> {
    let temp = TempDir::new()?;
    let (pipeline, records) = pipeline_with(
        &temp,
        FixedTranscriber::failing(),
        FixedEnricher::replying(Enrichment::default()),
    )?;

    let err = pipeline.ingest(upload(None, None)).await.unwrap_err();
    assert!(matches!(err, IngestError::Transcription(_)));

    // The blob was already written when transcription failed; only the
    // record is withheld
    let uploads: Vec<_> = std::fs::read_dir(temp.path().join("uploads"))?.collect();
    assert_eq!(uploads.len(), 1);

    let page = records.search(&SearchQuery::new("", None, None))?;
    assert_eq!(page.total, 0);

    Ok(())
}

#[tokio::test]
async fn test_ingest_empty_transcript_is_a_failure() -> Result<()> {
    let temp = TempDir::new()?;
    let (pipeline, records) = pipeline_with(
        &temp,
        FixedTranscriber::text("   \n"),
        FixedEnricher::replying(Enrichment::default()),
    )?;

    let err = pipeline.ingest(upload(None, None)).await.unwrap_err();
    assert!(matches!(err, IngestError::EmptyTranscript));

    let page = records.search(&SearchQuery::new("", None, None))?;
    assert_eq!(page.total, 0);

    Ok(())
}
