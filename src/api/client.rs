//! HTTP client for the NASA APOD API.

use std::time::Duration;

use chrono::NaiveDate;
use reqwest::blocking::Client;
use serde::Deserialize;

use super::{ApodMetadata, MetadataSource};
use crate::fetch::{build_client, FetchError};

/// Public APOD endpoint.
pub const DEFAULT_API_URL: &str = "https://api.nasa.gov/planetary/apod";

/// NASA's shared, rate-limited demo key. Real use should configure its own.
pub const DEFAULT_API_KEY: &str = "DEMO_KEY";

/// Raw response body of the APOD endpoint.
///
/// Only the fields the cache needs are modelled; the rest are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct ApodResponse {
    pub title: Option<String>,
    pub explanation: Option<String>,
    pub url: Option<String>,
    pub hdurl: Option<String>,
    pub thumbnail_url: Option<String>,
    pub media_type: Option<String>,
    pub copyright: Option<String>,
}

impl ApodResponse {
    /// Pick the URL to download: the HD image when there is one, the video
    /// thumbnail for video days, the plain `url` otherwise.
    #[must_use]
    pub fn image_url(&self) -> Option<&str> {
        [&self.hdurl, &self.thumbnail_url, &self.url]
            .into_iter()
            .filter_map(Option::as_deref)
            .map(str::trim)
            .find(|url| !url.is_empty())
    }

    /// Convert into [`ApodMetadata`] for the requested date.
    pub fn into_metadata(self, date: NaiveDate, source: &str) -> Result<ApodMetadata, FetchError> {
        let image_url = self
            .image_url()
            .map(str::to_string)
            .ok_or(FetchError::MissingImageUrl { date })?;

        let title = non_empty(self.title).ok_or_else(|| FetchError::InvalidResponse {
            url: source.to_string(),
            message: "missing title".to_string(),
        })?;
        let explanation = non_empty(self.explanation).ok_or_else(|| FetchError::InvalidResponse {
            url: source.to_string(),
            message: "missing explanation".to_string(),
        })?;

        Ok(ApodMetadata {
            date,
            title,
            explanation,
            image_url,
            media_type: self.media_type,
            copyright: self.copyright.map(|c| c.trim().to_string()),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Blocking client for the APOD endpoint.
#[derive(Debug, Clone)]
pub struct ApodClient {
    client: Client,
    api_url: String,
    api_key: String,
}

impl ApodClient {
    /// Create a client for `api_url` authenticating with `api_key`.
    pub fn new(
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        Ok(Self {
            client: build_client(timeout)?,
            api_url: api_url.into(),
            api_key: api_key.into(),
        })
    }

    #[must_use]
    pub fn api_url(&self) -> &str {
        &self.api_url
    }
}

impl MetadataSource for ApodClient {
    fn fetch_metadata(&self, date: NaiveDate) -> Result<ApodMetadata, FetchError> {
        let date_param = date.format("%Y-%m-%d").to_string();
        log::info!("Getting {} APOD information from NASA", date_param);

        // The key travels as a query parameter; errors only ever mention
        // the bare endpoint.
        let response = self
            .client
            .get(&self.api_url)
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("date", date_param.as_str()),
                ("thumbs", "True"),
            ])
            .send()
            .map_err(|source| FetchError::Http {
                url: self.api_url.clone(),
                source: source.without_url(),
            })?;

        if !response.status().is_success() {
            return Err(FetchError::from_status(&self.api_url, response));
        }

        let body: ApodResponse = response.json().map_err(|e| FetchError::InvalidResponse {
            url: self.api_url.clone(),
            message: e.without_url().to_string(),
        })?;

        let metadata = body.into_metadata(date, &self.api_url)?;
        log::info!("APOD title: {}", metadata.title);
        log::debug!("APOD image URL: {}", metadata.image_url);
        Ok(metadata)
    }
}
