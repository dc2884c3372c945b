//! File naming for cached images.
//!
//! A cached image is named after its title, not its hash, so the cache
//! directory stays browsable:
//!
//! ```
//! use apod_cache::cache::PathResolver;
//! use std::path::Path;
//!
//! let resolver = PathResolver::new("/var/cache/apod");
//! let path = resolver.resolve(
//!     " NGC #3521: Galaxy in a Bubble ",
//!     "https://apod.nasa.gov/apod/image/2205/NGC3521LRGBHaAPOD-20.jpg",
//! );
//! assert_eq!(path, Path::new("/var/cache/apod/NGC_3521_Galaxy_in_a_Bubble.jpg"));
//! ```
//!
//! Two titles that sanitize to the same stem map to the same file. That is
//! accepted; the coordinator only logs when it overwrites something.

use regex::Regex;
use reqwest::Url;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

/// Extension used when the URL does not carry a usable one.
pub const DEFAULT_EXTENSION: &str = "jpg";

/// Stem used when nothing of the title survives sanitizing.
pub const FALLBACK_STEM: &str = "untitled";

const MAX_EXTENSION_LEN: usize = 5;

static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Punctuation dropped from titles. The second row is not valid in Windows
/// file names. Whitespace controls such as `\n` and `\t` are kept so they
/// become underscores like any other whitespace.
fn is_stripped(c: char) -> bool {
    matches!(
        c,
        '?' | '!' | '.' | ',' | ';' | ':' | '/' | '@' | '#' | '$' | '%' | '^' | '&' | '*' | '('
            | ')' | '\''
            | '\\' | '<' | '>' | '"' | '|'
    ) || (c.is_control() && !c.is_whitespace())
}

/// Maps `(title, image URL)` pairs to paths under a fixed cache root.
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
}

impl PathResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Destination path for an image. Pure; touches no files.
    #[must_use]
    pub fn resolve(&self, title: &str, source_url: &str) -> PathBuf {
        let mut stem = sanitize_title(title);
        if stem.is_empty() {
            stem.push_str(FALLBACK_STEM);
        }
        let file_name = format!("{stem}.{}", extension_from_url(source_url));
        self.root.join(file_name)
    }
}

/// Turn a title into a file stem.
///
/// NFC-normalizes, drops the stripped punctuation, trims, then collapses
/// each whitespace run to one underscore. Sanitizing a sanitized stem is a
/// no-op.
#[must_use]
pub fn sanitize_title(title: &str) -> String {
    // Dropping a character can leave a base letter next to a combining mark,
    // so normalize again afterwards.
    let kept: String = title.nfc().filter(|&c| !is_stripped(c)).nfc().collect();
    WHITESPACE_RUN.replace_all(kept.trim(), "_").into_owned()
}

/// Extension of the last path segment of `url`, lowercased.
///
/// Query strings and fragments are ignored. Anything that is not a short
/// alphanumeric suffix falls back to [`DEFAULT_EXTENSION`].
#[must_use]
pub fn extension_from_url(url: &str) -> String {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    };

    let segment = path.rsplit('/').next().unwrap_or_default();
    segment
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| {
            !ext.is_empty()
                && ext.len() <= MAX_EXTENSION_LEN
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .map_or_else(|| DEFAULT_EXTENSION.to_string(), str::to_ascii_lowercase)
}
