//! The single decision point for "is this image cached; if not, cache it".
//!
//! # Pipeline
//!
//! 1. Fingerprint the image bytes.
//! 2. Look the fingerprint up in the [`MetadataStore`].
//! 3. Hit: return the existing id. Nothing is written, whatever the date.
//! 4. Miss: resolve a path from the title, write the bytes, insert a row.
//!
//! A row is only inserted after its file has been written and synced, so a
//! row never points at a missing or partial file. The reverse is tolerated:
//! if the insert fails after a successful write, the file stays on disk.
//! Such a file is harmless because lookups go through the hash column only,
//! and the next successful run for the same image simply rewrites it.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tempfile::NamedTempFile;
use thiserror::Error;

use super::database::{MetadataStore, StoreError};
use super::entry::{CacheEntry, NewEntry, RecordId};
use super::hasher::fingerprint;
use super::path::PathResolver;
use crate::api::{ApodMetadata, MetadataSource};
use crate::fetch::{ContentFetcher, FetchError};

/// File name of the metadata database inside the cache root.
pub const DATABASE_FILE_NAME: &str = "image_cache.db";

/// Errors that abort a caching operation.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Metadata or image bytes could not be obtained.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The image file could not be written.
    #[error("Failed to write image file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The metadata store rejected an operation.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result alias for coordinator operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Where the cache lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    /// Directory holding the image files.
    pub cache_dir: PathBuf,
    /// Metadata database file.
    pub database: PathBuf,
}

impl CacheSettings {
    /// Settings with the database stored inside `cache_dir`.
    pub fn in_dir(cache_dir: impl Into<PathBuf>) -> Self {
        let cache_dir = cache_dir.into();
        let database = cache_dir.join(DATABASE_FILE_NAME);
        Self {
            cache_dir,
            database,
        }
    }
}

/// How [`CacheCoordinator::ensure_cached`] satisfied a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    /// The image was already cached under this id.
    Hit(RecordId),
    /// The image was written and recorded under this new id.
    Stored(RecordId),
}

impl CacheOutcome {
    #[must_use]
    pub fn id(self) -> RecordId {
        match self {
            Self::Hit(id) | Self::Stored(id) => id,
        }
    }

    #[must_use]
    pub fn is_hit(self) -> bool {
        matches!(self, Self::Hit(_))
    }
}

/// Owns the cache directory, the metadata store and the naming policy.
#[derive(Debug, Clone)]
pub struct CacheCoordinator {
    store: MetadataStore,
    resolver: PathResolver,
}

impl CacheCoordinator {
    /// Create the cache directory if needed and open the store.
    pub fn open(settings: &CacheSettings) -> CacheResult<Self> {
        log::info!("Image cache directory: {}", settings.cache_dir.display());
        if settings.cache_dir.is_dir() {
            log::debug!("Image cache directory already exists");
        } else {
            std::fs::create_dir_all(&settings.cache_dir).map_err(|source| CacheError::Write {
                path: settings.cache_dir.clone(),
                source,
            })?;
            log::info!("Image cache directory created");
        }

        let store = MetadataStore::initialize(&settings.database)?;
        Ok(Self {
            store,
            resolver: PathResolver::new(&settings.cache_dir),
        })
    }

    #[must_use]
    pub fn store(&self) -> &MetadataStore {
        &self.store
    }

    #[must_use]
    pub fn cache_dir(&self) -> &Path {
        self.resolver.root()
    }

    /// Make sure `image_bytes` is cached and return its record id.
    ///
    /// Identical bytes always map to the same id: a second call with the same
    /// content, for any date, neither writes a file nor inserts a row.
    ///
    /// # Errors
    ///
    /// [`CacheError::Write`] if the file cannot be written (no row is added),
    /// [`CacheError::Store`] if the lookup or insert fails. Metadata with an
    /// empty title or explanation is rejected before any file is written.
    pub fn ensure_cached(
        &self,
        date: NaiveDate,
        metadata: &ApodMetadata,
        image_bytes: &[u8],
    ) -> CacheResult<CacheOutcome> {
        let hash = fingerprint(image_bytes);
        log::info!("APOD SHA-256: {}", hash);

        if let Some(id) = self.store.find_by_hash(&hash)? {
            log::info!("APOD image already in cache (id {})", id);
            return Ok(CacheOutcome::Hit(id));
        }
        log::info!("APOD image is not already in cache");

        let path = self.resolver.resolve(&metadata.title, &metadata.image_url);
        let entry = NewEntry {
            title: &metadata.title,
            explanation: &metadata.explanation,
            file_path: &path,
            content_hash: &hash,
            date,
        };
        // Reject the row before touching disk: the path may belong to an
        // entry that is already committed.
        if let Some(field) = entry.missing_field() {
            return Err(StoreError::MissingField(field).into());
        }

        log::info!("Saving image file as: {}", path.display());
        self.write_image(&path, image_bytes)?;

        let id = self.store.insert(&entry).inspect_err(|e| {
            log::warn!(
                "Image written to {} but not recorded ({}); the file is left in place",
                path.display(),
                e
            );
        })?;

        log::info!("Added APOD to image cache DB (id {})", id);
        Ok(CacheOutcome::Stored(id))
    }

    /// Fetch metadata and image for `date`, then cache it.
    pub fn add_apod(
        &self,
        date: NaiveDate,
        source: &dyn MetadataSource,
        fetcher: &dyn ContentFetcher,
    ) -> CacheResult<CacheOutcome> {
        log::info!("APOD date: {}", date);
        let metadata = source.fetch_metadata(date)?;
        let bytes = fetcher.fetch_bytes(&metadata.image_url)?;
        self.ensure_cached(date, &metadata, &bytes)
    }

    /// Resolve a record id to its full entry.
    pub fn entry(&self, id: RecordId) -> CacheResult<Option<CacheEntry>> {
        Ok(self.store.get_by_id(id)?)
    }

    /// Titles of every cached image, oldest first.
    pub fn titles(&self) -> CacheResult<Vec<String>> {
        Ok(self.store.list_titles()?)
    }

    /// Every cached entry, oldest first.
    pub fn entries(&self) -> CacheResult<Vec<CacheEntry>> {
        Ok(self.store.list_entries()?)
    }

    /// Write through a temp file in the destination directory, then move it
    /// into place. On any failure the temp file is removed when dropped and
    /// the destination is left untouched.
    fn write_image(&self, path: &Path, bytes: &[u8]) -> CacheResult<()> {
        let write_err = |source| CacheError::Write {
            path: path.to_path_buf(),
            source,
        };

        let dir = path.parent().unwrap_or_else(|| self.resolver.root());
        let mut temp = NamedTempFile::new_in(dir).map_err(write_err)?;
        temp.write_all(bytes).map_err(write_err)?;
        temp.as_file().sync_all().map_err(write_err)?;

        if path.exists() {
            log::warn!(
                "Overwriting {}: another title maps to the same file name",
                path.display()
            );
        }

        temp.persist(path).map_err(|e| write_err(e.error))?;
        Ok(())
    }
}
