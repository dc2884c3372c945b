//! Cache entry definitions.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Store-assigned identifier of a cached image.
///
/// Ids come from SQLite's `INTEGER PRIMARY KEY` and are always positive,
/// so there is no "zero means missing" convention: lookups that find
/// nothing return `None` instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(i64);

impl RecordId {
    /// Wrap a raw row id. Returns `None` for values SQLite never assigns.
    #[must_use]
    pub fn new(raw: i64) -> Option<Self> {
        (raw > 0).then_some(Self(raw))
    }

    #[must_use]
    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RecordId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw: i64 = s
            .trim()
            .parse()
            .map_err(|_| format!("Invalid record id: '{s}'"))?;
        Self::new(raw).ok_or_else(|| format!("Record ids are positive, got {raw}"))
    }
}

/// One cached image as stored in the `apods` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub id: RecordId,
    pub title: String,
    pub explanation: String,
    /// Date the image was first requested for.
    pub date: NaiveDate,
    /// Absolute path of the image bytes.
    pub file_path: PathBuf,
    /// Hex SHA-256 of the image bytes.
    pub content_hash: String,
}

/// Row payload for [`MetadataStore::insert`](super::MetadataStore::insert).
#[derive(Debug, Clone, Copy)]
pub struct NewEntry<'a> {
    pub title: &'a str,
    pub explanation: &'a str,
    pub file_path: &'a Path,
    pub content_hash: &'a str,
    pub date: NaiveDate,
}

impl NewEntry<'_> {
    /// Name of the first required field that is empty, if any.
    #[must_use]
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.title.trim().is_empty() {
            Some("title")
        } else if self.explanation.trim().is_empty() {
            Some("explanation")
        } else if self.file_path.as_os_str().is_empty() {
            Some("file_path")
        } else if self.content_hash.is_empty() {
            Some("hash")
        } else {
            None
        }
    }
}
