//! Clients for the external capabilities: speech-to-text and transcript
//! enrichment.
//!
//! Both capabilities are traits so the ingestion pipeline can swap providers
//! and tests can run without network access. [`OpenAiClient`] implements
//! both in production.

pub mod openai;

pub use openai::OpenAiClient;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("API key not configured")]
    ApiKeyMissing,

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API returned status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("malformed API response: {0}")]
    MalformedResponse(String),
}

/// Speech-to-text over an uploaded media file.
#[async_trait]
pub trait TranscriptionBackend: Send + Sync {
    /// Whether the backend holds the credentials it needs to serve requests.
    fn is_configured(&self) -> bool;

    /// Transcribe the media bytes, returning the raw transcript text.
    async fn transcribe(
        &self,
        file_name: &str,
        mime_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, ClientError>;
}

/// Input to one enrichment call: the raw transcript plus whatever metadata
/// the user already supplied, so the model only fills the gaps.
#[derive(Debug, Clone)]
pub struct EnrichmentRequest {
    pub transcript: String,
    pub name: Option<String>,
    pub description: Option<String>,
}

/// A parsed enrichment reply. Every field is optional; empty strings from
/// the model are treated as absent.
#[derive(Debug, Clone, Default)]
pub struct Enrichment {
    pub formatted_text: Option<String>,
    pub generated_title: Option<String>,
    pub generated_description: Option<String>,
}

/// Transcript formatting and metadata generation via an LLM.
#[async_trait]
pub trait EnrichmentBackend: Send + Sync {
    /// Whether the backend holds the credentials it needs to serve requests.
    fn is_configured(&self) -> bool;

    /// Ask the model to format the transcript and fill missing metadata.
    async fn enrich(&self, request: &EnrichmentRequest) -> Result<Enrichment, ClientError>;
}
