//! # DreamBank - Dream Report Snapshots for Rust
//!
//! This crate scrapes the DreamBank dream-report website into a curated,
//! version-controlled snapshot and reads that snapshot back. Every file that
//! passes through it is pinned by a SHA-256 hash in a plain-text registry,
//! so a published version always reads back byte for byte.
//!
//! ## Features
//!
//! - Cached, rate-limited page retrieval with hash verification
//! - Parsers for the dream sample, info and further-analyses pages
//! - Curation into one delimited dream table and one info JSON per series
//! - Source and curated registries of `fname sha256:hash [url]` lines
//! - Versioned access to published snapshots, remote or local
//! - Async API with Tokio
//! - Robust error handling and logging
//!
//! ## Example
//!
//! ```rust,no_run
//! use dreambank::access::Repository;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let repo = Repository::new("v1").await?;
//!
//!     let info = repo.read_info("alta").await?;
//!     let dreams = repo.read_dreams("alta").await?;
//!     println!("{} ({}): {} dreams", info.long_name, info.timeframe, dreams.len());
//!
//!     for dream in dreams.iter().take(3) {
//!         println!("#{} {}", dream.n, dream.dream);
//!     }
//!     Ok(())
//! }
//! ```

mod error;

pub mod access;
pub mod curation;
pub mod dataset;
pub mod hash;
pub mod parser;
pub mod registry;
pub mod source;

pub use error::{Error, Result};

/// Re-export of types module for public use
pub mod prelude {
    pub use crate::access::Repository;
    pub use crate::dataset::{DatasetInfo, DreamRecord, DreamTable};
    pub use crate::error::Error;
    pub use crate::error::Result;
}
