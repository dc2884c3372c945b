//! Structured error handling and exit codes.

use serde::Serialize;

use crate::cache::CacheError;

/// Exit codes for the apod-cache binary.
///
/// - 0: Success
/// - 1: General error (configuration, arguments, unexpected failure)
/// - 2: Metadata or image could not be fetched
/// - 3: Image file could not be written
/// - 4: Metadata store failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    FetchFailed = 2,
    WriteFailed = 3,
    StoreFailed = 4,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "AP000",
            Self::GeneralError => "AP001",
            Self::FetchFailed => "AP002",
            Self::WriteFailed => "AP003",
            Self::StoreFailed => "AP004",
        }
    }

    /// Pick the exit code for an application error by looking for a
    /// [`CacheError`] anywhere in its chain.
    #[must_use]
    pub fn for_error(err: &anyhow::Error) -> Self {
        err.chain()
            .find_map(|cause| cause.downcast_ref::<CacheError>())
            .map_or(Self::GeneralError, |cache_err| match cache_err {
                CacheError::Fetch(_) => Self::FetchFailed,
                CacheError::Write { .. } => Self::WriteFailed,
                CacheError::Store(_) => Self::StoreFailed,
            })
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "AP002")
    pub code: String,
    pub exit_code: i32,
    /// Top-level message
    pub message: String,
    /// Underlying causes, outermost first
    pub causes: Vec<String>,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: err.to_string(),
            causes: err.chain().skip(1).map(ToString::to_string).collect(),
        }
    }
}
