use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

/// Page size used when the caller supplies none.
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// A persisted transcription. Created once by the ingestion pipeline and
/// immutable until deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptionRecord {
    /// Unique identifier, assigned at insert
    pub id: String,

    /// Generated storage filename (`<unix-millis>-<sanitized name>`)
    pub filename: String,

    /// Client-supplied file name, unsanitized, informational only
    pub original_name: String,

    /// Title, user-supplied or model-generated; may stay absent
    pub name: Option<String>,

    /// Summary, user-supplied or model-generated; may stay absent
    pub description: Option<String>,

    /// Raw transcript as returned by the transcription capability
    pub text: String,

    /// Markdown-formatted transcript; the raw transcript when enrichment
    /// degraded
    pub formatted_text: Option<String>,

    /// Insert time; primary sort key for history listings
    pub created_at: DateTime<Utc>,
}

/// Fields for a record about to be inserted; id and created_at are assigned
/// by the store.
#[derive(Debug, Clone)]
pub struct NewRecord {
    pub filename: String,
    pub original_name: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub text: String,
    pub formatted_text: Option<String>,
}

/// Normalized history query: non-positive or missing paging values fall back
/// to page 1 and [`DEFAULT_PAGE_SIZE`].
#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub term: String,
    pub page: i64,
    pub page_size: i64,
}

impl SearchQuery {
    pub fn new(term: impl Into<String>, page: Option<i64>, page_size: Option<i64>) -> Self {
        Self {
            term: term.into(),
            page: page.filter(|p| *p > 0).unwrap_or(1),
            page_size: page_size.filter(|n| *n > 0).unwrap_or(DEFAULT_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.page_size)
    }
}

/// One page of history results plus the pre-pagination match count.
#[derive(Debug, Clone)]
pub struct RecordPage {
    pub items: Vec<TranscriptionRecord>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
}

impl RecordPage {
    pub fn total_pages(&self) -> i64 {
        self.total / self.page_size + i64::from(self.total % self.page_size != 0)
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("record store lock poisoned")]
    LockPoisoned,
}

const RECORD_COLUMNS: &str =
    "id, filename, original_name, name, description, text, formatted_text, created_at";

/// Match-all when ?1 (the raw term) is empty, substring match over the four
/// searchable fields otherwise. ?2 is the escaped LIKE pattern.
const SEARCH_PREDICATE: &str = "(?1 = '' \
     OR name LIKE ?2 ESCAPE '\\' \
     OR description LIKE ?2 ESCAPE '\\' \
     OR text LIKE ?2 ESCAPE '\\' \
     OR formatted_text LIKE ?2 ESCAPE '\\')";

/// SQLite-backed store for [`TranscriptionRecord`]s.
///
/// The connection sits behind a mutex; every operation takes the lock for the
/// duration of its statements, so concurrent requests see whole operations,
/// never partial ones.
#[derive(Clone)]
pub struct RecordStore {
    conn: Arc<Mutex<Connection>>,
}

impl RecordStore {
    /// Open (creating if necessary) the database at `path` and ensure the
    /// schema exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create database directory")?;
        }

        let conn = Connection::open(path).context("Failed to open database")?;
        init_schema(&conn).context("Failed to initialize database schema")?;

        info!("Record store ready at {}", path.display());
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// In-memory store, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        init_schema(&conn).context("Failed to initialize database schema")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// Insert a new record, assigning its id and creation time.
    pub fn insert(&self, new: NewRecord) -> Result<TranscriptionRecord, StoreError> {
        let record = TranscriptionRecord {
            id: Uuid::new_v4().to_string(),
            filename: new.filename,
            original_name: new.original_name,
            name: new.name,
            description: new.description,
            text: new.text,
            formatted_text: new.formatted_text,
            // Truncated to the stored precision, so the returned record
            // equals what a later fetch reads back
            created_at: Utc::now().trunc_subsecs(6),
        };

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO transcriptions \
             (id, filename, original_name, name, description, text, formatted_text, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                record.id,
                record.filename,
                record.original_name,
                record.name,
                record.description,
                record.text,
                record.formatted_text,
                timestamp_to_sql(record.created_at),
            ],
        )?;

        Ok(record)
    }

    /// Count matches, then fetch one page ordered by `created_at DESC` with
    /// `id DESC` as the deterministic tie-break.
    ///
    /// A non-empty term matches records containing it as a substring of any
    /// of name, description, text, or formatted_text; an empty term matches
    /// everything. Matching uses SQLite LIKE: case-insensitive for ASCII,
    /// case-sensitive beyond it. Count and fetch run under one lock
    /// acquisition, so a page is internally consistent.
    pub fn search(&self, query: &SearchQuery) -> Result<RecordPage, StoreError> {
        let pattern = like_pattern(&query.term);
        let conn = self.conn()?;

        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM transcriptions WHERE {SEARCH_PREDICATE}"),
            params![query.term, pattern],
            |row| row.get(0),
        )?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM transcriptions WHERE {SEARCH_PREDICATE} \
             ORDER BY created_at DESC, id DESC LIMIT ?3 OFFSET ?4"
        ))?;
        let items = stmt
            .query_map(
                params![query.term, pattern, query.page_size, query.offset()],
                record_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RecordPage {
            items,
            total,
            page: query.page,
            page_size: query.page_size,
        })
    }

    /// Hard-delete the record with the given id.
    ///
    /// Deleting an id that is not present fails with [`StoreError::NotFound`];
    /// a repeated delete is therefore never a silent success. The stored media
    /// file is not touched.
    pub fn delete(&self, id: &str) -> Result<(), StoreError> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM transcriptions WHERE id = ?1", params![id])?;

        if deleted == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }
}

fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS transcriptions (
            id             TEXT PRIMARY KEY,
            filename       TEXT NOT NULL,
            original_name  TEXT NOT NULL,
            name           TEXT,
            description    TEXT,
            text           TEXT NOT NULL,
            formatted_text TEXT,
            created_at     TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_transcriptions_created_at
            ON transcriptions (created_at DESC, id DESC);",
    )
}

/// Fixed-width RFC 3339 (microseconds, Z suffix) so lexicographic order in
/// SQL equals chronological order.
fn timestamp_to_sql(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn record_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TranscriptionRecord> {
    let created_raw: String = row.get(7)?;
    let created_at = DateTime::parse_from_rfc3339(&created_raw)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(7, Type::Text, Box::new(err)))?
        .with_timezone(&Utc);

    Ok(TranscriptionRecord {
        id: row.get(0)?,
        filename: row.get(1)?,
        original_name: row.get(2)?,
        name: row.get(3)?,
        description: row.get(4)?,
        text: row.get(5)?,
        formatted_text: row.get(6)?,
        created_at,
    })
}

/// Wrap a search term in `%`, escaping LIKE metacharacters so the term only
/// ever matches as a literal substring.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}
