//! Content-addressed image cache.
//!
//! Downloaded images are keyed by the SHA-256 of their bytes, so the same
//! picture is stored once no matter how many dates resolve to it.
//!
//! # Architecture
//!
//! * [`hasher`]: SHA-256 fingerprints of raw bytes.
//! * [`path`]: file names derived from image titles.
//! * [`database`]: SQLite persistence of the `apods` table.
//! * [`entry`]: the row types stored in the database.
//! * [`coordinator`]: the hit-or-store decision tying the above together.

pub mod coordinator;
pub mod database;
pub mod entry;
pub mod hasher;
pub mod path;

pub use coordinator::{
    CacheCoordinator, CacheError, CacheOutcome, CacheResult, CacheSettings, DATABASE_FILE_NAME,
};
pub use database::{MetadataStore, StoreError, StoreResult};
pub use entry::{CacheEntry, NewEntry, RecordId};
pub use hasher::{fingerprint, Fingerprinter};
pub use path::PathResolver;
