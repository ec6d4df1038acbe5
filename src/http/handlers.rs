use super::state::AppState;
use crate::pipeline::{IngestError, IngestRequest, UploadedFile};
use crate::store::{SearchQuery, StoreError, TranscriptionRecord};
use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    /// Search term, matched as a substring of any text field
    pub q: Option<String>,

    /// 1-based page number (default: 1)
    pub page: Option<String>,

    /// Records per page (default: 10)
    pub limit: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscribeResponse {
    pub text: String,
    pub formatted_text: String,
    pub record: TranscriptionRecord,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub data: Vec<TranscriptionRecord>,
    pub meta: HistoryMeta,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryMeta {
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /transcriptions
/// Upload a media file and run it through the full pipeline
pub async fn create_transcription(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let mut file: Option<UploadedFile> = None;
    let mut name: Option<String> = None;
    let mut description: Option<String> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(ErrorResponse {
                        error: format!("Invalid multipart body: {}", e),
                    }),
                )
                    .into_response();
            }
        };

        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "file" => {
                let original_name = field.file_name().unwrap_or("upload").to_string();
                let mime_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                match field.bytes().await {
                    Ok(bytes) => {
                        file = Some(UploadedFile {
                            bytes: bytes.to_vec(),
                            original_name,
                            mime_type,
                        });
                    }
                    Err(e) => {
                        return (
                            StatusCode::BAD_REQUEST,
                            Json(ErrorResponse {
                                error: format!("Failed to read file field: {}", e),
                            }),
                        )
                            .into_response();
                    }
                }
            }
            // Empty text fields count as absent, same as leaving them out.
            "name" => name = field.text().await.ok().filter(|v| !v.is_empty()),
            "description" => description = field.text().await.ok().filter(|v| !v.is_empty()),
            _ => {}
        }
    }

    let file = match file {
        Some(file) => file,
        None => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: "No file provided".to_string(),
                }),
            )
                .into_response();
        }
    };

    info!("Received transcription upload: {}", file.original_name);

    match state
        .pipeline
        .ingest(IngestRequest {
            file,
            name,
            description,
        })
        .await
    {
        Ok(outcome) => (
            StatusCode::OK,
            Json(TranscribeResponse {
                text: outcome.text,
                formatted_text: outcome.formatted_text,
                record: outcome.record,
            }),
        )
            .into_response(),
        Err(err) => {
            let status = match err {
                IngestError::MissingFile => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            if status.is_server_error() {
                error!("Transcription request failed: {}", err);
            }
            (
                status,
                Json(ErrorResponse {
                    error: err.to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// GET /transcriptions
/// Paged history, optionally filtered by a search term
pub async fn list_transcriptions(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> impl IntoResponse {
    let query = SearchQuery::new(
        params.q.unwrap_or_default(),
        parse_paging(params.page.as_deref()),
        parse_paging(params.limit.as_deref()),
    );

    match state.records.search(&query) {
        Ok(page) => {
            let meta = HistoryMeta {
                total: page.total,
                page: page.page,
                limit: page.page_size,
                total_pages: page.total_pages(),
            };
            (
                StatusCode::OK,
                Json(HistoryResponse {
                    data: page.items,
                    meta,
                }),
            )
                .into_response()
        }
        Err(err) => {
            error!("History fetch failed: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to fetch history".to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// DELETE /transcriptions/:id
/// Remove a single record; the stored media file stays on disk
pub async fn delete_transcription(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    info!("Deleting transcription: {}", id);

    match state.records.delete(&id) {
        Ok(()) => (StatusCode::OK, Json(DeleteResponse { success: true })).into_response(),
        Err(StoreError::NotFound(_)) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("Transcription {} not found", id),
            }),
        )
            .into_response(),
        Err(err) => {
            error!("Failed to delete record {}: {}", id, err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to delete record".to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Paging params arrive as free-form strings; non-numeric input is treated
/// the same as an absent param.
fn parse_paging(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|value| value.parse().ok())
}
