//! OpenAI-backed implementation of both capability traits: Whisper-style
//! audio transcription and chat-completion enrichment.

use async_trait::async_trait;
use reqwest::multipart;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::config::OpenAiConfig;

use super::{ClientError, Enrichment, EnrichmentBackend, EnrichmentRequest, TranscriptionBackend};

const SYSTEM_PROMPT: &str = "You are an expert editor.\n\
1. Reformat the transcript below into readable markdown with proper paragraphs, punctuation, and capitalization.\n\
2. If the user did NOT provide a title (existing title is ABSENT), generate a concise, relevant title (at most 10 words).\n\
3. If the user did NOT provide a description (existing description is ABSENT), generate a brief summary (at most 30 words).\n\
4. Keep the original language of the audio.\n\
\n\
Reply with ONLY one VALID JSON object with this structure:\n\
{\n\
  \"formattedText\": \"string (markdown)\",\n\
  \"generatedTitle\": \"string (optional, only when needed)\",\n\
  \"generatedDescription\": \"string (optional, only when needed)\"\n\
}";

/// Client for the OpenAI audio transcription and chat completion endpoints.
///
/// Built once at startup and shared. A missing API key is not a construction
/// error: `is_configured` reports it, and callers decide per request, so the
/// service boots without credentials.
pub struct OpenAiClient {
    client: reqwest::Client,
    api_key: Option<String>,
    api_base: String,
    transcription_model: String,
    enrichment_model: String,
}

impl OpenAiClient {
    pub fn new(settings: &OpenAiConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: settings.api_key.clone(),
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            transcription_model: settings.transcription_model.clone(),
            enrichment_model: settings.enrichment_model.clone(),
        }
    }

    fn api_key(&self) -> Result<&str, ClientError> {
        self.api_key.as_deref().ok_or(ClientError::ApiKeyMissing)
    }
}

#[async_trait]
impl TranscriptionBackend for OpenAiClient {
    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn transcribe(
        &self,
        file_name: &str,
        mime_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, ClientError> {
        let api_key = self.api_key()?;

        let part = multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime_type)?;
        let form = multipart::Form::new()
            .text("model", self.transcription_model.clone())
            .part("file", part);

        debug!(model = %self.transcription_model, file = %file_name, "Requesting transcription");

        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.api_base))
            .bearer_auth(api_key)
            .multipart(form)
            .send()
            .await?;

        let body = read_json(response).await?;
        let text = body
            .get("text")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ClientError::MalformedResponse("transcription reply has no text field".to_string())
            })?;

        Ok(text.to_string())
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[async_trait]
impl EnrichmentBackend for OpenAiClient {
    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn enrich(&self, request: &EnrichmentRequest) -> Result<Enrichment, ClientError> {
        let api_key = self.api_key()?;

        let body = ChatRequest {
            model: self.enrichment_model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user_context(request),
                },
            ],
            response_format: ResponseFormat { kind: "json_object" },
        };

        debug!(model = %self.enrichment_model, "Requesting enrichment");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let reply = read_json(response).await?;
        let content = reply["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| {
                ClientError::MalformedResponse("chat reply has no message content".to_string())
            })?;

        parse_enrichment(content)
    }
}

/// Tell the model which metadata already exists so it only generates what is
/// missing.
fn user_context(request: &EnrichmentRequest) -> String {
    format!(
        "Transcript:\n{}\n\nExisting title: {}\nExisting description: {}",
        request.transcript,
        request.name.as_deref().unwrap_or("ABSENT"),
        request.description.as_deref().unwrap_or("ABSENT"),
    )
}

/// Parse the model's JSON reply with explicit field and type checks. A
/// missing, ill-typed, or empty field stays `None`; only non-JSON content is
/// an error.
fn parse_enrichment(content: &str) -> Result<Enrichment, ClientError> {
    let value: Value = serde_json::from_str(content).map_err(|err| {
        ClientError::MalformedResponse(format!("enrichment reply is not JSON: {err}"))
    })?;

    let field = |name: &str| {
        value
            .get(name)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    Ok(Enrichment {
        formatted_text: field("formattedText"),
        generated_title: field("generatedTitle"),
        generated_description: field("generatedDescription"),
    })
}

async fn read_json(response: reqwest::Response) -> Result<Value, ClientError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ClientError::Api {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response.json().await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(api_key: Option<&str>) -> OpenAiConfig {
        OpenAiConfig {
            api_key: api_key.map(str::to_string),
            api_base: "https://api.openai.com/v1/".to_string(),
            transcription_model: "whisper-1".to_string(),
            enrichment_model: "gpt-4-turbo".to_string(),
        }
    }

    #[test]
    fn test_configured_only_with_api_key() {
        let client = OpenAiClient::new(&settings(None));
        assert!(!TranscriptionBackend::is_configured(&client));
        assert!(!EnrichmentBackend::is_configured(&client));

        let client = OpenAiClient::new(&settings(Some("sk-test")));
        assert!(TranscriptionBackend::is_configured(&client));
        assert!(EnrichmentBackend::is_configured(&client));
    }

    #[test]
    fn test_api_base_trailing_slash_trimmed() {
        let client = OpenAiClient::new(&settings(Some("sk-test")));
        assert_eq!(client.api_base, "https://api.openai.com/v1");
    }

    #[test]
    fn test_parse_enrichment_full_reply() {
        let parsed = parse_enrichment(
            r###"{"formattedText": "## Notes\n\nHello.", "generatedTitle": "Team sync", "generatedDescription": "A short sync."}"###,
        )
        .unwrap();

        assert_eq!(parsed.formatted_text.as_deref(), Some("## Notes\n\nHello."));
        assert_eq!(parsed.generated_title.as_deref(), Some("Team sync"));
        assert_eq!(parsed.generated_description.as_deref(), Some("A short sync."));
    }

    #[test]
    fn test_parse_enrichment_partial_reply() {
        let parsed = parse_enrichment(r#"{"formattedText": "Hello."}"#).unwrap();
        assert_eq!(parsed.formatted_text.as_deref(), Some("Hello."));
        assert_eq!(parsed.generated_title, None);
        assert_eq!(parsed.generated_description, None);
    }

    #[test]
    fn test_parse_enrichment_ignores_empty_and_ill_typed_fields() {
        let parsed =
            parse_enrichment(r#"{"formattedText": "", "generatedTitle": 42, "generatedDescription": null}"#)
                .unwrap();
        assert_eq!(parsed.formatted_text, None);
        assert_eq!(parsed.generated_title, None);
        assert_eq!(parsed.generated_description, None);
    }

    #[test]
    fn test_parse_enrichment_rejects_non_json() {
        let err = parse_enrichment("Sure! Here is the formatted text:").unwrap_err();
        assert!(matches!(err, ClientError::MalformedResponse(_)));
    }

    #[test]
    fn test_user_context_marks_absent_metadata() {
        let context = user_context(&EnrichmentRequest {
            transcript: "hello world".to_string(),
            name: Some("Standup".to_string()),
            description: None,
        });

        assert!(context.contains("Transcript:\nhello world"));
        assert!(context.contains("Existing title: Standup"));
        assert!(context.contains("Existing description: ABSENT"));
    }
}
