//! Error types for the source module

use crate::error::Error as CrateError;
use thiserror::Error;

/// Error type for fetching source pages
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("HTTP status {status_code} for {url}")]
    Status {
        /// HTTP status code
        status_code: u16,
        /// Requested URL
        url: String,
    },

    /// Cache directory or file error
    #[error("Cache error: {0}")]
    Cache(#[from] std::io::Error),

    /// URL parsing error
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Unknown page component name
    #[error("Unknown component '{0}', expected one of dreams, info, moreinfo")]
    UnknownComponent(String),

    /// Grid page yielded the same dataset twice
    #[error("Duplicate dataset identifier in grid: {0}")]
    DuplicateDataset(String),

    /// Downloaded file does not match its known hash
    #[error("Hash mismatch for {fname}: expected {expected}, got {actual}")]
    HashMismatch {
        fname: String,
        expected: String,
        actual: String,
    },

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl From<FetchError> for CrateError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Http(e) => CrateError::Http(e),
            FetchError::Cache(e) => CrateError::Io(e),
            FetchError::HashMismatch {
                fname,
                expected,
                actual,
            } => CrateError::HashMismatch {
                fname,
                expected,
                actual,
            },
            FetchError::UnknownComponent(_) => CrateError::InvalidRequest(err.to_string()),
            _ => CrateError::Fetch(err.to_string()),
        }
    }
}
