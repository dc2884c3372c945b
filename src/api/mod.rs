//! NASA Astronomy Picture of the Day metadata.
//!
//! This module provides the metadata side of the pipeline:
//!
//! * [`ApodMetadata`]: the title, explanation and image URL for one date.
//! * [`MetadataSource`]: the collaborator trait the cache consumes.
//! * [`client`]: the HTTP implementation against `api.nasa.gov`.

pub mod client;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::fetch::FetchError;

pub use client::{ApodClient, ApodResponse, DEFAULT_API_KEY, DEFAULT_API_URL};

/// Date of the first Astronomy Picture of the Day.
pub const FIRST_APOD_DATE: NaiveDate = match NaiveDate::from_ymd_opt(1995, 6, 16) {
    Some(date) => date,
    None => panic!("invalid first APOD date"),
};

/// Metadata describing the picture published on one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApodMetadata {
    /// Date the record was requested for.
    pub date: NaiveDate,
    pub title: String,
    pub explanation: String,
    /// URL of the image to cache (HD image, or the thumbnail for videos).
    pub image_url: String,
    /// `image` or `video`, as reported by the API.
    pub media_type: Option<String>,
    pub copyright: Option<String>,
}

impl ApodMetadata {
    /// Minimal metadata record, mostly useful for tests and fakes.
    pub fn new(
        date: NaiveDate,
        title: impl Into<String>,
        explanation: impl Into<String>,
        image_url: impl Into<String>,
    ) -> Self {
        Self {
            date,
            title: title.into(),
            explanation: explanation.into(),
            image_url: image_url.into(),
            media_type: None,
            copyright: None,
        }
    }
}

/// Supplies the APOD metadata for a date.
pub trait MetadataSource {
    fn fetch_metadata(&self, date: NaiveDate) -> Result<ApodMetadata, FetchError>;
}
