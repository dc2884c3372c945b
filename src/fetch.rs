//! Raw byte retrieval over HTTP.
//!
//! [`ContentFetcher`] is the seam between the cache and the network: the
//! coordinator only ever asks for "the bytes at this URL", which keeps it
//! testable with in-memory fakes.

use std::io::Read;
use std::time::Duration;

use bytesize::ByteSize;
use chrono::NaiveDate;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use thiserror::Error;

use crate::progress::Progress;

/// Errors raised while talking to remote services.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The request could not be sent or the connection failed.
    #[error("Request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[error("Request to {url} returned {status}: {message}")]
    Status {
        url: String,
        status: StatusCode,
        message: String,
    },

    /// The response body could not be read.
    #[error("Failed to read response from {url}: {source}")]
    Read {
        url: String,
        #[source]
        source: std::io::Error,
    },

    /// The response was readable but not what we expected.
    #[error("Unexpected response from {url}: {message}")]
    InvalidResponse { url: String, message: String },

    /// The APOD record for a date carries no downloadable image.
    #[error("APOD for {date} has no image URL")]
    MissingImageUrl { date: NaiveDate },
}

impl FetchError {
    /// Build a [`FetchError::Status`] from a failed response, keeping the
    /// start of the body as the message.
    pub(crate) fn from_status(url: &str, response: reqwest::blocking::Response) -> Self {
        const MAX_MESSAGE_LEN: usize = 200;

        let status = response.status();
        let mut message = response.text().unwrap_or_default().trim().to_string();
        if message.len() > MAX_MESSAGE_LEN {
            let cut = (0..=MAX_MESSAGE_LEN)
                .rev()
                .find(|&i| message.is_char_boundary(i))
                .unwrap_or(0);
            message.truncate(cut);
            message.push_str("...");
        }
        if message.is_empty() {
            message = status.canonical_reason().unwrap_or("no reason").to_string();
        }

        Self::Status {
            url: url.to_string(),
            status,
            message,
        }
    }
}

/// Retrieves the raw bytes behind a URL.
pub trait ContentFetcher {
    /// Download the resource at `url` into memory.
    fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Build the blocking client shared by the fetchers in this crate.
pub(crate) fn build_client(timeout: Duration) -> Result<Client, FetchError> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(FetchError::Client)
}

/// [`ContentFetcher`] backed by a blocking reqwest client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    progress: Progress,
}

impl HttpFetcher {
    /// Create a fetcher with the given request timeout.
    pub fn new(timeout: Duration, progress: Progress) -> Result<Self, FetchError> {
        Ok(Self {
            client: build_client(timeout)?,
            progress,
        })
    }
}

impl ContentFetcher for HttpFetcher {
    fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        log::info!("Downloading image from {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .map_err(|source| FetchError::Http {
                url: url.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(FetchError::from_status(url, response));
        }

        let total = response.content_length();
        let capacity = total.and_then(|len| usize::try_from(len).ok()).unwrap_or(0);
        let bar = self.progress.download_bar(total, "Downloading");

        let mut bytes = Vec::with_capacity(capacity);
        let read = bar.wrap_read(response).read_to_end(&mut bytes);
        bar.finish_and_clear();
        read.map_err(|source| FetchError::Read {
            url: url.to_string(),
            source,
        })?;

        if bytes.is_empty() {
            return Err(FetchError::InvalidResponse {
                url: url.to_string(),
                message: "empty body".to_string(),
            });
        }

        log::info!("Downloaded {}", ByteSize::b(bytes.len() as u64));
        Ok(bytes)
    }
}
