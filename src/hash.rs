//! File hashing in the `alg:hex` notation used by registry files

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use sha2::{Digest, Sha256};
use tokio::fs;

use crate::error::{Error, Result};

/// The only hash algorithm registries use
pub const HASH_ALGORITHM: &str = "sha256";

/// A known sha256 digest, printed as `sha256:<hex>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnownHash(String);

impl KnownHash {
    /// Wrap a hex digest, normalising it to lower case
    pub fn from_hex(hex_digest: impl AsRef<str>) -> Result<Self> {
        let digest = hex_digest.as_ref().trim().to_ascii_lowercase();
        if digest.len() != 64 || !digest.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::Registry(format!(
                "Invalid sha256 digest: {}",
                hex_digest.as_ref()
            )));
        }
        Ok(Self(digest))
    }

    /// Hex digest without the algorithm prefix
    pub fn hex(&self) -> &str {
        &self.0
    }

    /// Whether the file at `path` hashes to this digest
    pub async fn matches(&self, path: &Path) -> Result<bool> {
        Ok(file_hash(path).await? == self.0)
    }
}

impl FromStr for KnownHash {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once(':') {
            Some((alg, digest)) if alg.eq_ignore_ascii_case(HASH_ALGORITHM) => {
                Self::from_hex(digest)
            }
            Some((alg, _)) => Err(Error::Registry(format!(
                "Unsupported hash algorithm: {}",
                alg
            ))),
            None => Self::from_hex(s),
        }
    }
}

impl fmt::Display for KnownHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", HASH_ALGORITHM, self.0)
    }
}

/// Lowercase hex sha256 of a byte slice
pub fn bytes_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Lowercase hex sha256 of a file's contents
pub async fn file_hash(path: &Path) -> Result<String> {
    let bytes = fs::read(path).await?;
    Ok(bytes_hash(&bytes))
}
