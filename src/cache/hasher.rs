//! SHA-256 content fingerprints.
//!
//! # Overview
//! Every cached image is keyed by the SHA-256 digest of its raw bytes,
//! rendered as 64 lowercase hex characters. Metadata text never takes part
//! in the digest, so the same picture published under two dates produces
//! the same fingerprint.

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Length of a hex-encoded fingerprint.
pub const FINGERPRINT_LEN: usize = 64;

/// Buffer size used when re-hashing files from disk.
const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Compute the fingerprint of a byte slice.
///
/// # Example
///
/// ```
/// use apod_cache::cache::hasher::fingerprint;
///
/// let digest = fingerprint(b"abc");
/// assert_eq!(
///     digest,
///     "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
/// );
/// ```
#[must_use]
pub fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Fingerprinter::new();
    hasher.update(bytes);
    hasher.finish()
}

/// Re-hash a file that is already on disk.
///
/// Used to verify that a cached file still matches the fingerprint stored
/// for it.
pub fn fingerprint_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Fingerprinter::new();
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];

    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(hasher.finish())
}

/// Incremental fingerprint builder.
///
/// Feeds data in chunks, so files can be hashed without loading them whole.
#[derive(Debug, Clone, Default)]
pub struct Fingerprinter {
    inner: Sha256,
}

impl Fingerprinter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed more bytes into the digest.
    pub fn update(&mut self, bytes: &[u8]) {
        self.inner.update(bytes);
    }

    /// Consume the builder and return the hex digest.
    #[must_use]
    pub fn finish(self) -> String {
        format!("{:x}", self.inner.finalize())
    }
}

/// Check that a string looks like a fingerprint produced by this module.
#[must_use]
pub fn is_fingerprint(s: &str) -> bool {
    s.len() == FINGERPRINT_LEN && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
