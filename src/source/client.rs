//! Cached, hash-verified downloads from the DreamBank site

use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::Client as ReqwestClient;
use tokio::fs;
use tracing::{Instrument, debug, debug_span, info, instrument, warn};

use crate::hash::{KnownHash, bytes_hash};
use crate::registry::Registry;
use crate::source::error::FetchError;
use crate::source::lister::parse_dataset_ids;
use crate::source::{Component, SourceConfig};

/// Decode ISO-8859-1 bytes; every byte is the code point of the same value
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Client for the DreamBank site
///
/// Pages are stored under the configured cache directory and only fetched
/// again when missing or when they no longer match their known hash.
#[derive(Clone)]
pub struct SourceClient {
    client: ReqwestClient,
    config: SourceConfig,
    limiter: Arc<DefaultDirectRateLimiter>,
    registry: Option<Registry>,
}

impl std::fmt::Debug for SourceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceClient")
            .field("config", &self.config)
            .field("registry_entries", &self.registry.as_ref().map(Registry::len))
            .finish()
    }
}

impl SourceClient {
    /// Create a client without a source registry
    pub fn new(config: SourceConfig) -> Result<Self, FetchError> {
        let client = ReqwestClient::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()?;
        let per_minute = NonZeroU32::new(config.requests_per_minute).unwrap_or(NonZeroU32::MIN);
        Ok(Self {
            client,
            config,
            limiter: Arc::new(RateLimiter::direct(Quota::per_minute(per_minute))),
            registry: None,
        })
    }

    /// Verify page downloads against a source registry
    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    pub fn registry(&self) -> Option<&Registry> {
        self.registry.as_ref()
    }

    /// Path a file is cached at
    pub fn cache_path(&self, fname: &str) -> PathBuf {
        self.config.cache_dir.join(fname)
    }

    /// Return a local copy of `url`, downloading it if needed
    ///
    /// A cached copy is reused when no hash is known or when it matches the
    /// known hash. Fresh downloads are checked against the known hash and
    /// discarded on mismatch.
    #[instrument(skip(self, known_hash))]
    pub async fn retrieve(
        &self,
        url: &str,
        fname: &str,
        known_hash: Option<&KnownHash>,
    ) -> Result<PathBuf, FetchError> {
        let path = self.cache_path(fname);

        if fs::try_exists(&path).await? {
            match known_hash {
                None => {
                    debug!("Using cached {}", path.display());
                    return Ok(path);
                }
                Some(expected) => {
                    let actual = bytes_hash(&fs::read(&path).await?);
                    if actual == expected.hex() {
                        debug!("Using verified cached {}", path.display());
                        return Ok(path);
                    }
                    warn!("Cached {} does not match its hash, downloading again", fname);
                }
            }
        }

        let bytes = self.download(url).await?;
        let actual = bytes_hash(&bytes);
        if let Some(expected) = known_hash {
            if actual != expected.hex() {
                return Err(FetchError::HashMismatch {
                    fname: fname.to_string(),
                    expected: expected.to_string(),
                    actual: format!("sha256:{}", actual),
                });
            }
        }

        write_atomic(&path, &bytes).await?;
        info!("Downloaded {} ({} bytes)", fname, bytes.len());
        Ok(path)
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let parsed = url::Url::parse(url)?;
        self.limiter
            .until_ready()
            .instrument(debug_span!("limiter"))
            .await;

        debug!("Sending GET request to {}", parsed);
        let response = self.client.get(parsed).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status_code: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }

    /// Local copy of the grid page listing every series
    pub async fn fetch_grid(&self) -> Result<PathBuf, FetchError> {
        let known_hash = self
            .config
            .grid_hash
            .as_deref()
            .map(str::parse::<KnownHash>)
            .transpose()
            .map_err(|e| FetchError::Other(format!("Invalid grid hash: {}", e)))?;
        let url = self.config.url_for("grid.cgi");
        self.retrieve(&url, "grid.html", known_hash.as_ref()).await
    }

    /// Sorted identifiers of every series on the grid page
    #[instrument(skip(self))]
    pub async fn list_dataset_ids(&self) -> Result<Vec<String>, FetchError> {
        let path = self.fetch_grid().await?;
        let html = decode_latin1(&fs::read(&path).await?);
        let ids = parse_dataset_ids(&html)?;
        info!("Found {} datasets", ids.len());
        Ok(ids)
    }

    /// Local copy of one page of a series
    ///
    /// With a source registry loaded, the registry's URL and hash are used;
    /// otherwise the page is fetched from its default location unverified.
    pub async fn fetch_page(
        &self,
        dataset: &str,
        component: Component,
    ) -> Result<PathBuf, FetchError> {
        let fname = component.fname(dataset);
        let entry = self.registry.as_ref().and_then(|r| r.get(&fname));
        let url = entry
            .and_then(|e| e.url.clone())
            .unwrap_or_else(|| self.config.url_for(&component.path(dataset)));
        self.retrieve(&url, &fname, entry.map(|e| &e.hash)).await
    }

    /// Decoded HTML of one page of a series
    pub async fn read_page(&self, dataset: &str, component: Component) -> Result<String, FetchError> {
        let path = self.fetch_page(dataset, component).await?;
        Ok(decode_latin1(&fs::read(path).await?))
    }
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), FetchError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let partial = path.with_extension("part");
    fs::write(&partial, bytes).await?;
    fs::rename(&partial, path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server, ServerGuard};

    fn client_for(server: &ServerGuard, cache_dir: &Path) -> SourceClient {
        let config = SourceConfig::builder()
            .base_url(server.url())
            .cache_dir(cache_dir)
            .requests_per_minute(6000)
            .grid_hash(None)
            .build();
        SourceClient::new(config).unwrap()
    }

    #[test]
    fn test_decode_latin1() {
        assert_eq!(decode_latin1(b"caf\xe9 \xbfqu\xe9?"), "café ¿qué?");
    }

    #[tokio::test]
    async fn test_fetch_page_caches_download() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/random_sample.cgi")
            .match_query(Matcher::UrlEncoded("series".into(), "alta".into()))
            .with_status(200)
            .with_body(b"<html>caf\xe9</html>".to_vec())
            .expect(1)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let client = client_for(&server, dir.path());

        let html = client.read_page("alta", Component::Dreams).await.unwrap();
        assert_eq!(html, "<html>café</html>");
        assert!(dir.path().join("alta/dreams.html").exists());

        // second read is served from the cache
        let again = client.read_page("alta", Component::Dreams).await.unwrap();
        assert_eq!(again, html);

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_hash_mismatch_is_rejected() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/grid.cgi")
            .with_status(200)
            .with_body("<html></html>")
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let client = client_for(&server, dir.path());
        let expected = KnownHash::from_hex(bytes_hash(b"something else")).unwrap();

        let url = format!("{}/grid.cgi", server.url());
        let result = client.retrieve(&url, "grid.html", Some(&expected)).await;
        assert!(matches!(result, Err(FetchError::HashMismatch { .. })));
        assert!(!dir.path().join("grid.html").exists());

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_stale_cache_is_refreshed() {
        let mut server = Server::new_async().await;
        let body = "<html>fresh</html>";
        let mock = server
            .mock("GET", "/grid.cgi")
            .with_status(200)
            .with_body(body)
            .expect(1)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("grid.html"), "<html>stale</html>")
            .await
            .unwrap();

        let client = client_for(&server, dir.path());
        let expected = KnownHash::from_hex(bytes_hash(body.as_bytes())).unwrap();
        let url = format!("{}/grid.cgi", server.url());
        let path = client.retrieve(&url, "grid.html", Some(&expected)).await.unwrap();

        assert_eq!(fs::read_to_string(path).await.unwrap(), body);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_status() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/more_info.cgi")
            .match_query(Matcher::Any)
            .with_status(404)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let client = client_for(&server, dir.path());
        let result = client.fetch_page("nobody", Component::Info).await;
        assert!(matches!(
            result,
            Err(FetchError::Status { status_code: 404, .. })
        ));

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_list_dataset_ids() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/grid.cgi")
            .with_status(200)
            .with_body(
                r#"<input type="checkbox" value="vickie"><input type="checkbox" value="alta">"#,
            )
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let client = client_for(&server, dir.path());
        let ids = client.list_dataset_ids().await.unwrap();
        assert_eq!(ids, vec!["alta", "vickie"]);

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_registry_url_and_hash_used() {
        let mut server = Server::new_async().await;
        let body = "<html>registered</html>";
        let mock = server
            .mock("GET", "/mirror/alta-info.html")
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;

        let registry = Registry::parse(&format!(
            "alta/info.html sha256:{} {}/mirror/alta-info.html\n",
            bytes_hash(body.as_bytes()),
            server.url()
        ))
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let client = client_for(&server, dir.path()).with_registry(registry);
        let html = client.read_page("alta", Component::Info).await.unwrap();
        assert_eq!(html, body);

        mock.assert_async().await;
    }
}
