//! Configuration for reading a published snapshot

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::hash::KnownHash;

/// Snapshot version whose registry ships with this crate
pub const CURRENT_VERSION: &str = "v1";

/// Where versioned curated files are published; `{version}` is substituted
pub const DEFAULT_BASE_URL: &str = "https://github.com/dxelab/dreambank/raw/{version}/data/";

/// Where the registry of each version is published
pub const DEFAULT_REGISTRY_URL: &str =
    "https://github.com/dxelab/dreambank/raw/{version}/src/dreambank/data/registry.txt";

/// Registry hashes of older published versions
const OLD_REGISTRY_HASHES: &[(&str, &str)] = &[(
    "v0",
    "sha256:fe0d7f655f1363dc2cc7f2e5eac3dbe7e7b299446aafe19c872f737e90454a5a",
)];

/// Configuration for a remote repository
#[derive(Debug, Clone)]
pub struct AccessConfig {
    /// Version to read, e.g. `v1`
    pub version: String,

    /// Newest published version; its registry is trusted without a known hash
    pub current_version: String,

    /// Local registry to use instead of the published one
    pub registry_path: Option<PathBuf>,

    /// URL template of curated files
    pub base_url: String,

    /// URL template of published registries
    pub registry_url: String,

    /// Known registry hashes of older versions
    pub old_registries: BTreeMap<String, String>,

    /// Download cache; each version gets its own subdirectory
    pub cache_dir: PathBuf,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION.to_string(),
            current_version: CURRENT_VERSION.to_string(),
            registry_path: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            registry_url: DEFAULT_REGISTRY_URL.to_string(),
            old_registries: OLD_REGISTRY_HASHES
                .iter()
                .map(|(version, hash)| (version.to_string(), hash.to_string()))
                .collect(),
            cache_dir: PathBuf::from(".dreambank/cache"),
            timeout_secs: 60,
        }
    }
}

impl AccessConfig {
    /// Default configuration for a version
    pub fn for_version(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            ..Default::default()
        }
    }

    /// Base URL of curated files for the configured version
    pub fn version_base_url(&self) -> String {
        with_version(&self.base_url, &self.version)
    }

    /// URL of the registry of the configured version
    pub fn version_registry_url(&self) -> String {
        with_version(&self.registry_url, &self.version)
    }

    /// Known hash of the published registry of the configured version
    ///
    /// The current version has none. Other versions must be listed in
    /// `old_registries`.
    pub fn registry_hash(&self) -> Result<Option<KnownHash>> {
        match self.old_registries.get(&self.version) {
            Some(hash) => Ok(Some(hash.parse()?)),
            None if self.version == self.current_version => Ok(None),
            None => Err(Error::InvalidRequest(format!(
                "Unknown snapshot version: {}",
                self.version
            ))),
        }
    }

    /// Cache directory of the configured version
    pub fn version_cache_dir(&self) -> PathBuf {
        self.cache_dir.join(&self.version)
    }
}

fn with_version(template: &str, version: &str) -> String {
    template.replace("{version}", version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_urls() {
        let config = AccessConfig::for_version("v0");
        assert_eq!(
            config.version_base_url(),
            "https://github.com/dxelab/dreambank/raw/v0/data/"
        );
        assert!(config.version_registry_url().contains("/v0/src/"));
        assert_eq!(config.version_cache_dir(), PathBuf::from(".dreambank/cache/v0"));
        assert!(config.old_registries.contains_key("v0"));
        assert!(config.registry_hash().unwrap().is_some());
    }

    #[test]
    fn test_registry_hash_by_version() {
        assert!(AccessConfig::default().registry_hash().unwrap().is_none());
        assert!(matches!(
            AccessConfig::for_version("v9").registry_hash(),
            Err(Error::InvalidRequest(msg)) if msg.contains("v9")
        ));
    }
}
