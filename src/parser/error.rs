//! Error types for the parser module

use crate::error::Error as CrateError;
use thiserror::Error;

/// Error type for parsing source pages
#[derive(Debug, Error)]
pub enum ParseError {
    /// A dream span does not start with `#<n>`
    #[error("{dataset}: dream {index} has no dream number: {snippet}")]
    MissingDreamNumber {
        dataset: String,
        /// Position of the span on the page
        index: usize,
        /// Start of the span text
        snippet: String,
    },

    /// A dream does not end with its word count
    #[error("{dataset}: dream #{n} has no trailing word count")]
    MissingWordCount { dataset: String, n: String },

    /// The same dream number appears twice
    #[error("{dataset}: duplicate dream number #{n}")]
    DuplicateDream { dataset: String, n: String },

    /// The page has no dream count statement
    #[error("{dataset}: dream count statement not found")]
    MissingCount { dataset: String },

    /// Stated and extracted dream counts disagree
    #[error(
        "{dataset}: series has {total} dreams, page displays {displayed}, extracted {extracted}"
    )]
    CountMismatch {
        dataset: String,
        total: usize,
        displayed: usize,
        extracted: usize,
    },

    /// A labelled value is missing from the info page
    #[error("{dataset}: label '{label}' not found")]
    MissingLabel { dataset: String, label: String },

    /// A labelled value is not a number
    #[error("{dataset}: '{label}' is not a number: {value}")]
    InvalidNumber {
        dataset: String,
        label: String,
        value: String,
    },

    /// The free-form description could not be isolated
    #[error("{dataset}: description not found")]
    MissingDescription { dataset: String },

    /// CSS selector error
    #[error("Selector error: {0}")]
    Selector(String),
}

impl From<ParseError> for CrateError {
    fn from(err: ParseError) -> Self {
        CrateError::Parse(err.to_string())
    }
}
