//! # Registry Files
//!
//! A registry lists every file that belongs to a snapshot together with its
//! sha256 hash, one file per line:
//!
//! ```text
//! alta/dreams.html sha256:9f86d0... https://dreambank.net/random_sample.cgi?series=alta
//! alta.tsv sha256:60303a...
//! ```
//!
//! The source registry carries a download URL per line. The curated registry
//! omits it because curated files share one base URL per version.

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use tokio::fs;
use tracing::debug;

use crate::error::{Error, Result};
use crate::hash::KnownHash;

/// A single registry line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEntry {
    /// File name relative to the cache or data directory
    pub fname: String,

    /// Expected hash of the file
    pub hash: KnownHash,

    /// Download URL, when the file does not live under a shared base URL
    pub url: Option<String>,
}

impl RegistryEntry {
    /// Dataset identifier the file belongs to
    ///
    /// `alta/dreams.html` and `alta.tsv` both belong to `alta`.
    pub fn dataset_id(&self) -> &str {
        match self.fname.split_once('/') {
            Some((dir, _)) => dir,
            None => self
                .fname
                .split_once('.')
                .map_or(self.fname.as_str(), |(stem, _)| stem),
        }
    }
}

impl FromStr for RegistryEntry {
    type Err = Error;

    fn from_str(line: &str) -> Result<Self> {
        let mut parts = line.split_whitespace();
        let (Some(fname), Some(hash)) = (parts.next(), parts.next()) else {
            return Err(Error::Registry(format!("Malformed registry line: {}", line)));
        };
        let url = parts.next().map(str::to_string);
        if parts.next().is_some() {
            return Err(Error::Registry(format!(
                "Too many columns in registry line: {}",
                line
            )));
        }
        Ok(Self {
            fname: fname.to_string(),
            hash: hash.parse()?,
            url,
        })
    }
}

impl fmt::Display for RegistryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.fname, self.hash)?;
        if let Some(url) = &self.url {
            write!(f, " {}", url)?;
        }
        Ok(())
    }
}

/// Ordered collection of registry entries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registry {
    entries: Vec<RegistryEntry>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse registry text, skipping blank lines and `#` comments
    pub fn parse(text: &str) -> Result<Self> {
        let entries = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::parse)
            .collect::<Result<Vec<RegistryEntry>>>()?;
        Ok(Self { entries })
    }

    /// Load a registry file
    pub async fn load(path: &Path) -> Result<Self> {
        if !fs::try_exists(path).await? {
            return Err(Error::Registry(format!(
                "Registry not found: {}",
                path.display()
            )));
        }
        let text = fs::read_to_string(path).await?;
        let registry = Self::parse(&text)?;
        debug!("Loaded {} registry entries from {}", registry.len(), path.display());
        Ok(registry)
    }

    /// Write the registry with `\n` line endings
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(path, self.to_string()).await?;
        Ok(())
    }

    /// Append an entry, replacing any entry with the same file name
    pub fn insert(&mut self, entry: RegistryEntry) {
        match self.entries.iter_mut().find(|e| e.fname == entry.fname) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    /// Look up an entry by file name
    pub fn get(&self, fname: &str) -> Option<&RegistryEntry> {
        self.entries.iter().find(|e| e.fname == fname)
    }

    /// All entries in file order
    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sorted, de-duplicated dataset identifiers
    pub fn dataset_ids(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|e| e.dataset_id().to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

impl fmt::Display for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            writeln!(f, "{}", entry)?;
        }
        Ok(())
    }
}
