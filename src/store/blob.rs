use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tokio::fs;
use tracing::info;

/// Write-once file storage for uploaded media, rooted at a single directory.
///
/// Files are never rewritten or removed here: deleting a transcription record
/// leaves its media file behind, and the whole root is served read-only over
/// HTTP at `/uploads/{filename}`.
#[derive(Debug, Clone)]
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory all blobs live under.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persist uploaded bytes under a freshly generated filename.
    ///
    /// Returns the generated filename; the file lands at `root/<filename>`.
    pub async fn save(&self, original_name: &str, bytes: &[u8]) -> io::Result<String> {
        let filename = unique_filename(original_name, Utc::now());

        fs::create_dir_all(&self.root).await?;
        let path = self.root.join(&filename);
        fs::write(&path, bytes).await?;

        info!("Stored upload {} ({} bytes)", path.display(), bytes.len());
        Ok(filename)
    }
}

/// Build `<unix-millis>-<sanitized original name>`.
///
/// Collides only when two uploads share a sanitized name within the same
/// millisecond.
fn unique_filename(original_name: &str, now: DateTime<Utc>) -> String {
    format!("{}-{}", now.timestamp_millis(), sanitize_name(original_name))
}

/// Replace every character outside `[A-Za-z0-9.-]` with `_`.
fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
