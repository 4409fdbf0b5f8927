//! # Access Module
//!
//! The public face of the crate: read an already curated snapshot back into
//! memory. A `Repository` pairs a curated registry with a place the files
//! live, either a published version on the web or a local data directory.
//!
//! ## Example
//!
//! ```rust,no_run
//! use dreambank::access::Repository;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), dreambank::Error> {
//!     let repo = Repository::new("v1").await?;
//!     for id in repo.available_datasets() {
//!         let dreams = repo.read_dreams(&id).await?;
//!         println!("{}: {} dreams", id, dreams.len());
//!     }
//!     Ok(())
//! }
//! ```

mod config;
mod read;

pub use config::{AccessConfig, CURRENT_VERSION, DEFAULT_BASE_URL, DEFAULT_REGISTRY_URL};
pub use read::{dreams_from_bytes, read_dreams_file, read_info_file, read_info_map_file};

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::curation::TableFormat;
use crate::dataset::{DatasetInfo, DreamTable};
use crate::error::{Error, Result};
use crate::hash::file_hash;
use crate::registry::Registry;
use crate::source::{SourceClient, SourceConfig};

/// Where the files of a repository live
#[derive(Debug, Clone)]
enum Location {
    /// Published files, downloaded into a cache on first use
    Remote { base_url: String, client: SourceClient },
    /// Files in a local data directory
    Local { data_dir: PathBuf },
}

/// A versioned, hash-verified view of curated files
#[derive(Debug, Clone)]
pub struct Repository {
    version: String,
    registry: Registry,
    location: Location,
}

impl Repository {
    /// Open a published version with default settings
    pub async fn new(version: &str) -> Result<Self> {
        Self::open(AccessConfig::for_version(version)).await
    }

    /// Open a published version
    ///
    /// The registry is downloaded from the version's registry URL, unless
    /// `registry_path` points at a local one. Older versions check it against
    /// a known hash; versions that are neither current nor known are rejected.
    #[instrument(skip(config), fields(version = %config.version))]
    pub async fn open(config: AccessConfig) -> Result<Self> {
        let source = SourceConfig::builder()
            .cache_dir(config.version_cache_dir())
            .timeout_secs(config.timeout_secs)
            .requests_per_minute(600)
            .grid_hash(None)
            .build();
        let client = SourceClient::new(source)?;

        let registry = match &config.registry_path {
            Some(path) => Registry::load(path).await?,
            None => {
                let known = config.registry_hash()?;
                let path = client
                    .retrieve(&config.version_registry_url(), "registry.txt", known.as_ref())
                    .await?;
                Registry::load(&path).await?
            }
        };
        debug!("Registry lists {} files", registry.len());

        Ok(Self {
            version: config.version.clone(),
            registry,
            location: Location::Remote {
                base_url: config.version_base_url(),
                client,
            },
        })
    }

    /// Serve files from a local data directory, verified against a registry
    pub async fn local(data_dir: impl Into<PathBuf>, registry_path: &Path) -> Result<Self> {
        let registry = Registry::load(registry_path).await?;
        Ok(Self {
            version: "local".to_string(),
            registry,
            location: Location::Local {
                data_dir: data_dir.into(),
            },
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Sorted identifiers of every series in the registry
    pub fn available_datasets(&self) -> Vec<String> {
        self.registry.dataset_ids()
    }

    /// Path of a verified local copy of a registered file
    #[instrument(skip(self))]
    pub async fn fetch(&self, fname: &str) -> Result<PathBuf> {
        let entry = self.registry.get(fname).ok_or_else(|| {
            Error::InvalidRequest(format!("{} is not in the registry", fname))
        })?;

        match &self.location {
            Location::Remote { base_url, client } => {
                let url = format!("{}{}", base_url, fname);
                Ok(client.retrieve(&url, fname, Some(&entry.hash)).await?)
            }
            Location::Local { data_dir } => {
                let path = data_dir.join(fname);
                let actual = file_hash(&path).await?;
                if actual != entry.hash.hex() {
                    return Err(Error::HashMismatch {
                        fname: fname.to_string(),
                        expected: entry.hash.to_string(),
                        actual: format!("sha256:{}", actual),
                    });
                }
                Ok(path)
            }
        }
    }

    /// Dream table of a series
    pub async fn read_dreams(&self, dataset_id: &str) -> Result<DreamTable> {
        let fname = [TableFormat::Tsv, TableFormat::Csv]
            .into_iter()
            .map(|format| format!("{}.{}", dataset_id, format.extension()))
            .find(|fname| self.registry.get(fname).is_some())
            .ok_or_else(|| Error::UnknownDataset(dataset_id.to_string()))?;
        let path = self.fetch(&fname).await?;
        read_dreams_file(dataset_id, &path).await
    }

    /// Metadata of a series
    pub async fn read_info(&self, dataset_id: &str) -> Result<DatasetInfo> {
        let path = self.fetch(&self.info_fname(dataset_id)?).await?;
        read_info_file(&path).await
    }

    /// Metadata of a series as an untyped JSON object
    pub async fn read_info_map(&self, dataset_id: &str) -> Result<Map<String, Value>> {
        let path = self.fetch(&self.info_fname(dataset_id)?).await?;
        read_info_map_file(&path).await
    }

    fn info_fname(&self, dataset_id: &str) -> Result<String> {
        let fname = format!("{}.json", dataset_id);
        if self.registry.get(&fname).is_none() {
            return Err(Error::UnknownDataset(dataset_id.to_string()));
        }
        Ok(fname)
    }
}
