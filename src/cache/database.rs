//! SQLite-backed image metadata store.
//!
//! One table, `apods`, holds a row per distinct cached image. A unique
//! index on `hash` makes the content fingerprint the dedup key: inserting a
//! second row for an already stored hash is a no-op that hands back the
//! existing id, so two processes racing on the same new picture still end
//! up with a single row.
//!
//! Connections are opened per operation and dropped when it returns; the
//! store itself only remembers where the database file lives.

use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use super::entry::{CacheEntry, NewEntry, RecordId};

/// How long an operation waits on a lock held by another process.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS apods (
    id          INTEGER PRIMARY KEY,
    title       TEXT NOT NULL,
    explanation TEXT NOT NULL,
    date        DATE NOT NULL,
    file_path   TEXT NOT NULL,
    hash        TEXT NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_apods_hash ON apods(hash);
";

const ENTRY_COLUMNS: &str = "id, title, explanation, date, file_path, hash";

/// Errors raised by the metadata store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The directory that should hold the database could not be created.
    #[error("Failed to create database directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The database file could not be opened.
    #[error("Failed to open image cache database {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// A query or statement failed.
    #[error("Image cache database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// An insert was attempted with an empty required field.
    #[error("Cannot store image metadata: '{0}' is empty")]
    MissingField(&'static str),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Persistent index from content fingerprint to cached image metadata.
#[derive(Debug, Clone)]
pub struct MetadataStore {
    path: PathBuf,
}

impl MetadataStore {
    /// Open the store at `location`, creating the file, table and index if
    /// they do not exist yet.
    ///
    /// Calling this on an already initialized database changes nothing; it
    /// only re-reads the row count to confirm the table is usable.
    ///
    /// # Errors
    ///
    /// Fails if the parent directory cannot be created, the file is not a
    /// SQLite database, or the schema cannot be applied.
    pub fn initialize(location: &Path) -> StoreResult<Self> {
        if let Some(parent) = location.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let existed = location.is_file();
        let store = Self {
            path: location.to_path_buf(),
        };

        let conn = store.connect()?;
        conn.execute_batch(SCHEMA)?;
        let rows = count_rows(&conn)?;

        if existed {
            log::info!("Image cache DB already exists: {}", location.display());
        } else {
            log::info!("Image cache DB created: {}", location.display());
        }
        log::debug!("Image cache DB holds {} entries", rows);

        Ok(store)
    }

    /// Path of the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> StoreResult<Connection> {
        let conn = Connection::open(&self.path).map_err(|source| StoreError::Open {
            path: self.path.clone(),
            source,
        })?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(conn)
    }

    /// Look up the id of the entry whose image has the given fingerprint.
    ///
    /// `Ok(None)` means the image is not cached yet.
    pub fn find_by_hash(&self, hash: &str) -> StoreResult<Option<RecordId>> {
        let conn = self.connect()?;
        find_id_by_hash(&conn, hash)
    }

    /// Append a new entry and return its id.
    ///
    /// If a row with the same hash already exists (for example because a
    /// concurrent run stored the same picture first), nothing is written
    /// and the existing row's id is returned.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::MissingField`] if any required field is empty,
    /// or a database error if the write is rejected.
    pub fn insert(&self, entry: &NewEntry<'_>) -> StoreResult<RecordId> {
        if let Some(field) = entry.missing_field() {
            return Err(StoreError::MissingField(field));
        }

        let conn = self.connect()?;
        let file_path = entry.file_path.to_string_lossy().into_owned();
        let changed = conn.execute(
            "INSERT INTO apods (title, explanation, date, file_path, hash)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(hash) DO NOTHING",
            params![
                entry.title,
                entry.explanation,
                entry.date,
                file_path,
                entry.content_hash
            ],
        )?;

        if changed == 0 {
            log::debug!(
                "Hash {} was stored concurrently, reusing existing row",
                entry.content_hash
            );
            return find_id_by_hash(&conn, entry.content_hash)?
                .ok_or(StoreError::Sqlite(rusqlite::Error::QueryReturnedNoRows));
        }

        let raw = conn.last_insert_rowid();
        let id = RecordId::new(raw).ok_or(StoreError::Sqlite(
            rusqlite::Error::IntegralValueOutOfRange(0, raw),
        ))?;
        log::debug!("Inserted image cache entry {} ({})", id, entry.title);
        Ok(id)
    }

    /// Fetch a full entry by id. `Ok(None)` if no such row exists.
    pub fn get_by_id(&self, id: RecordId) -> StoreResult<Option<CacheEntry>> {
        let conn = self.connect()?;
        let entry = conn
            .query_row(
                &format!("SELECT {ENTRY_COLUMNS} FROM apods WHERE id = ?1"),
                params![id.get()],
                entry_from_row,
            )
            .optional()?;
        Ok(entry)
    }

    /// Titles of all cached images, oldest first.
    pub fn list_titles(&self) -> StoreResult<Vec<String>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare("SELECT title FROM apods ORDER BY id")?;
        let titles = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(titles)
    }

    /// All cached entries, oldest first.
    pub fn list_entries(&self) -> StoreResult<Vec<CacheEntry>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(&format!("SELECT {ENTRY_COLUMNS} FROM apods ORDER BY id"))?;
        let entries = stmt
            .query_map([], entry_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Number of rows in the table.
    pub fn count(&self) -> StoreResult<u64> {
        let conn = self.connect()?;
        count_rows(&conn)
    }
}

fn count_rows(conn: &Connection) -> StoreResult<u64> {
    let rows: i64 = conn.query_row("SELECT COUNT(*) FROM apods", [], |row| row.get(0))?;
    Ok(u64::try_from(rows).unwrap_or_default())
}

fn find_id_by_hash(conn: &Connection, hash: &str) -> StoreResult<Option<RecordId>> {
    let raw: Option<i64> = conn
        .query_row(
            "SELECT id FROM apods WHERE hash = ?1 ORDER BY id LIMIT 1",
            params![hash],
            |row| row.get(0),
        )
        .optional()?;

    match raw {
        Some(raw) => RecordId::new(raw)
            .map(Some)
            .ok_or(StoreError::Sqlite(rusqlite::Error::IntegralValueOutOfRange(0, raw))),
        None => Ok(None),
    }
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<CacheEntry> {
    let raw_id: i64 = row.get(0)?;
    let id = RecordId::new(raw_id).ok_or(rusqlite::Error::IntegralValueOutOfRange(0, raw_id))?;
    Ok(CacheEntry {
        id,
        title: row.get(1)?,
        explanation: row.get(2)?,
        date: row.get(3)?,
        file_path: PathBuf::from(row.get::<_, String>(4)?),
        content_hash: row.get(5)?,
    })
}
