//! Error types for the dreambank crate

use std::path::PathBuf;
use thiserror::Error;

/// Result type for dreambank operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for dreambank operations
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Delimited table error
    #[error("Table error: {0}")]
    Csv(#[from] csv::Error),

    /// Downloading or caching a file failed
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Source HTML did not have the expected shape
    #[error("Parse error: {0}")]
    Parse(String),

    /// Registry file is missing or malformed
    #[error("Registry error: {0}")]
    Registry(String),

    /// Downloaded or cached file does not match its registered hash
    #[error("Hash mismatch for {fname}: expected {expected}, got {actual}")]
    HashMismatch {
        /// File name in the registry
        fname: String,
        /// Registered hash
        expected: String,
        /// Hash of the file on disk
        actual: String,
    },

    /// Output file exists and overwriting was not requested
    #[error("File already exists: {}. Pass overwrite or delete the local file.", .0.display())]
    AlreadyExists(PathBuf),

    /// Dataset is not part of the registry
    #[error("Unknown dataset: {0}")]
    UnknownDataset(String),

    /// Invalid argument
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}
