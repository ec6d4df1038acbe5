//! HTTP API for uploading media and browsing transcription history
//!
//! - POST /transcriptions - Upload a file, get the finished transcription
//! - GET /transcriptions - Paged history with optional search
//! - DELETE /transcriptions/:id - Remove a record
//! - GET /uploads/:filename - Stored media files
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
