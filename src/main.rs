use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use scriba::{
    create_router, AppState, BlobStore, Config, EnrichmentBackend, IngestPipeline, OpenAiClient,
    RecordStore, TranscriptionBackend,
};
use tokio::net::TcpListener;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "scriba", about = "Transcription service for audio and video uploads")]
struct Args {
    /// Path to the configuration file (extension optional)
    #[arg(short, long, default_value = "config/scriba")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));
    info!("Uploads directory: {}", cfg.storage.uploads_dir);
    info!("Database: {}", cfg.storage.database_path);

    if cfg.openai.api_key.is_none() {
        warn!("OpenAI API key is not configured; uploads will fail until it is set");
    }

    let records = RecordStore::open(&cfg.storage.database_path)?;
    let blobs = BlobStore::new(&cfg.storage.uploads_dir);

    let client = Arc::new(OpenAiClient::new(&cfg.openai));
    let transcriber: Arc<dyn TranscriptionBackend> = client.clone();
    let enricher: Arc<dyn EnrichmentBackend> = client;

    let pipeline = Arc::new(IngestPipeline::new(
        blobs,
        records.clone(),
        transcriber,
        enricher,
    ));

    let state = AppState::new(pipeline, records, PathBuf::from(&cfg.storage.uploads_dir));
    let app = create_router(state);

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    info!("HTTP server listening on {}", addr);

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
