//! # Source Configuration
//!
//! Settings for talking to the DreamBank site: where it lives, where
//! downloads are cached, and how politely to fetch. Built with a builder,
//! with environment overrides for the values that differ between machines.
//!
//! ## Environment
//!
//! - `DREAMBANK_BASE_URL`: alternative site root (mirrors, tests)
//! - `DREAMBANK_CACHE_DIR`: download cache directory

use std::path::PathBuf;
use std::time::Duration;

/// Site root of the DreamBank archive
pub const DEFAULT_BASE_URL: &str = "https://dreambank.net";

/// Hash of the grid page snapshot the curated data was built from
pub const GRID_HASH: &str =
    "sha256:f31487774cce789fe9bcbe3c7c680be52fbdd8380afb391aee5fa1fe11e68660";

/// Configuration for the source client
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Site root, without trailing slash
    pub base_url: String,

    /// Directory that holds downloaded pages
    pub cache_dir: PathBuf,

    /// User agent to use for requests
    pub user_agent: String,

    /// Upper bound on requests sent per minute
    pub requests_per_minute: u32,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Expected hash of the grid page; `None` accepts whatever is served
    pub grid_hash: Option<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            cache_dir: PathBuf::from(".dreambank/cache"),
            user_agent: format!("dreambank/{}", env!("CARGO_PKG_VERSION")),
            requests_per_minute: 30,
            timeout_secs: 60,
            grid_hash: Some(GRID_HASH.to_string()),
        }
    }
}

/// Builder for SourceConfig
#[derive(Debug, Default)]
pub struct SourceConfigBuilder {
    config: SourceConfig,
}

impl SourceConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: SourceConfig::default(),
        }
    }

    /// Set the site root
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the download cache directory
    pub fn cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.config.cache_dir = cache_dir.into();
        self
    }

    /// Set the user agent to use for requests
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Set the request budget per minute
    pub fn requests_per_minute(mut self, requests_per_minute: u32) -> Self {
        self.config.requests_per_minute = requests_per_minute;
        self
    }

    /// Set the request timeout in seconds
    pub fn timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.config.timeout_secs = timeout_secs;
        self
    }

    /// Set the expected grid hash, or `None` to skip verification
    pub fn grid_hash(mut self, grid_hash: Option<String>) -> Self {
        self.config.grid_hash = grid_hash;
        self
    }

    /// Apply `DREAMBANK_BASE_URL` and `DREAMBANK_CACHE_DIR` when set
    pub fn from_env(mut self) -> Self {
        if let Ok(base_url) = std::env::var("DREAMBANK_BASE_URL") {
            self = self.base_url(base_url);
        }
        if let Ok(cache_dir) = std::env::var("DREAMBANK_CACHE_DIR") {
            self = self.cache_dir(cache_dir);
        }
        self
    }

    /// Build the configuration
    pub fn build(self) -> SourceConfig {
        self.config
    }
}

impl SourceConfig {
    /// Create a new builder
    pub fn builder() -> SourceConfigBuilder {
        SourceConfigBuilder::new()
    }

    /// Get the timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Absolute URL for a path below the site root
    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SourceConfig::default();
        assert_eq!(config.base_url, "https://dreambank.net");
        assert_eq!(config.grid_hash.as_deref(), Some(GRID_HASH));
        assert!(config.user_agent.starts_with("dreambank/"));
        assert_eq!(config.timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_builder_trims_base_url() {
        let config = SourceConfig::builder()
            .base_url("http://127.0.0.1:1234/")
            .cache_dir("/tmp/dreambank")
            .requests_per_minute(600)
            .grid_hash(None)
            .build();
        assert_eq!(config.base_url, "http://127.0.0.1:1234");
        assert_eq!(config.url_for("/grid.cgi"), "http://127.0.0.1:1234/grid.cgi");
        assert_eq!(config.cache_dir, PathBuf::from("/tmp/dreambank"));
        assert_eq!(config.requests_per_minute, 600);
        assert!(config.grid_hash.is_none());
    }
}
