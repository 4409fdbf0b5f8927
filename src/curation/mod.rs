//! # Curation Module
//!
//! The pipeline that turns the live site into the version-controlled
//! snapshot. It runs in two steps:
//!
//! 1. `Step::Source` downloads the three HTML pages of every series and
//!    records their hashes in the source registry.
//! 2. `Step::Tables` parses the registered pages, writes one dream table and
//!    one info JSON per series, and records their hashes in the curated
//!    registry that the access API reads.
//!
//! Existing outputs are never replaced unless the configuration asks for it.

mod config;
mod writer;

pub use config::{CurationConfig, CurationConfigBuilder, TableFormat};
pub use writer::{
    MISSING, dreams_to_bytes, info_to_bytes, write_dreams_table, write_info_json,
};

use std::fmt;
use std::str::FromStr;

use tokio::sync::mpsc;
use tracing::{info, instrument, warn};

use crate::error::{Error, Result};
use crate::hash::{KnownHash, file_hash};
use crate::parser::{has_further_analyses, parse_details, parse_dreams, parse_info};
use crate::registry::{Registry, RegistryEntry};
use crate::source::{Component, SourceClient};

/// A stage of the curation pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Step {
    /// Download source pages and write the source registry
    Source,
    /// Write curated tables, info JSON and the curated registry
    Tables,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Source => f.write_str("source"),
            Step::Tables => f.write_str("tables"),
        }
    }
}

impl FromStr for Step {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "source" => Ok(Step::Source),
            "tables" | "tsv" => Ok(Step::Tables),
            other => Err(Error::InvalidRequest(format!(
                "Unknown curation step '{}', expected source or tables",
                other
            ))),
        }
    }
}

/// Progress notification sent once per finished series
#[derive(Debug, Clone)]
pub struct Progress {
    pub step: Step,
    pub dataset: String,
    pub done: usize,
    pub total: usize,
}

/// Outcome of a curation run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CurationSummary {
    /// Series processed
    pub datasets: usize,
    /// Source pages registered
    pub source_files: usize,
    /// Dreams written across all tables
    pub dreams: usize,
}

/// Runs the curation pipeline
#[derive(Debug, Clone)]
pub struct Curator {
    config: CurationConfig,
    client: SourceClient,
    progress: Option<mpsc::Sender<Progress>>,
}

impl Curator {
    pub fn new(config: CurationConfig) -> Result<Self> {
        let client = SourceClient::new(config.source.clone())?;
        Ok(Self {
            config,
            client,
            progress: None,
        })
    }

    /// Report per-series progress on a channel
    pub fn with_progress(mut self, sender: mpsc::Sender<Progress>) -> Self {
        self.progress = Some(sender);
        self
    }

    pub fn config(&self) -> &CurationConfig {
        &self.config
    }

    /// Identifiers of every series on the grid page
    pub async fn dataset_ids(&self) -> Result<Vec<String>> {
        Ok(self.client.list_dataset_ids().await?)
    }

    /// Run the requested steps in pipeline order
    #[instrument(skip(self))]
    pub async fn run(&self, steps: &[Step]) -> Result<CurationSummary> {
        let mut steps = steps.to_vec();
        steps.sort();
        steps.dedup();

        let ids = self.dataset_ids().await?;
        let mut summary = CurationSummary {
            datasets: ids.len(),
            ..Default::default()
        };

        for step in steps {
            match step {
                Step::Source => {
                    let registry = self.write_source_registry(&ids).await?;
                    summary.source_files = registry.len();
                }
                Step::Tables => {
                    let client = self.verified_client().await?;
                    for (done, id) in ids.iter().enumerate() {
                        summary.dreams += self.curate_dataset_with(&client, id).await?;
                        self.report(Step::Tables, id, done + 1, ids.len()).await;
                    }
                    self.write_curated_registry(&ids).await?;
                }
            }
        }

        info!(
            "Curated {} datasets ({} dreams)",
            summary.datasets, summary.dreams
        );
        Ok(summary)
    }

    /// Download every page of every series and register its hash
    #[instrument(skip(self, ids), fields(datasets = ids.len()))]
    pub async fn write_source_registry(&self, ids: &[String]) -> Result<Registry> {
        let path = &self.config.source_registry_path;
        writer::prepare_target(path, self.config.overwrite).await?;

        let mut registry = Registry::new();
        for (done, id) in ids.iter().enumerate() {
            for component in Component::ALL {
                let fname = component.fname(id);
                let url = self.config.source.url_for(&component.path(id));
                let local = self.client.retrieve(&url, &fname, None).await?;
                registry.insert(RegistryEntry {
                    fname,
                    hash: KnownHash::from_hex(file_hash(&local).await?)?,
                    url: Some(url),
                });
            }
            self.report(Step::Source, id, done + 1, ids.len()).await;
        }

        registry.save(path).await?;
        info!("Wrote {} source entries to {}", registry.len(), path.display());
        Ok(registry)
    }

    /// Parse one series from its registered pages and write its files
    ///
    /// Returns the number of dreams written.
    pub async fn curate_dataset(&self, id: &str) -> Result<usize> {
        let client = self.verified_client().await?;
        self.curate_dataset_with(&client, id).await
    }

    #[instrument(skip(self, client))]
    async fn curate_dataset_with(&self, client: &SourceClient, id: &str) -> Result<usize> {
        let table_path = self.config.table_path(id);
        let info_path = self.config.info_path(id);
        for path in [&table_path, &info_path] {
            if !self.config.overwrite && tokio::fs::try_exists(path).await? {
                return Err(Error::AlreadyExists(path.clone()));
            }
        }

        let dreams_html = client.read_page(id, Component::Dreams).await?;
        let table = parse_dreams(id, &dreams_html)?;

        let info_html = client.read_page(id, Component::Info).await?;
        let mut info = parse_info(id, &info_html)?;
        if info.n_dreams as usize != table.len() {
            warn!(
                "{}: info page states {} dreams, table has {}",
                id,
                info.n_dreams,
                table.len()
            );
        }

        if self.config.include_details && has_further_analyses(&info_html) {
            let more_html = client.read_page(id, Component::MoreInfo).await?;
            info.details = parse_details(&more_html)?;
        }

        write_dreams_table(
            &table,
            &table_path,
            self.config.table_format,
            self.config.overwrite,
        )
        .await?;
        write_info_json(&info, &info_path, self.config.overwrite).await?;
        Ok(table.len())
    }

    /// Register the hash of every curated file
    #[instrument(skip(self, ids), fields(datasets = ids.len()))]
    pub async fn write_curated_registry(&self, ids: &[String]) -> Result<Registry> {
        let path = &self.config.curated_registry_path;
        writer::prepare_target(path, self.config.overwrite).await?;

        let mut registry = Registry::new();
        for id in ids {
            for local in [self.config.table_path(id), self.config.info_path(id)] {
                let fname = local
                    .file_name()
                    .and_then(|name| name.to_str())
                    .ok_or_else(|| {
                        Error::InvalidRequest(format!("Invalid file name: {}", local.display()))
                    })?
                    .to_string();
                registry.insert(RegistryEntry {
                    fname,
                    hash: KnownHash::from_hex(file_hash(&local).await?)?,
                    url: None,
                });
            }
        }

        registry.save(path).await?;
        info!("Wrote {} curated entries to {}", registry.len(), path.display());
        Ok(registry)
    }

    /// Source client that verifies pages against the source registry
    async fn verified_client(&self) -> Result<SourceClient> {
        let registry = Registry::load(&self.config.source_registry_path).await?;
        Ok(self.client.clone().with_registry(registry))
    }

    async fn report(&self, step: Step, dataset: &str, done: usize, total: usize) {
        if let Some(sender) = &self.progress {
            let _ = sender
                .send(Progress {
                    step,
                    dataset: dataset.to_string(),
                    done,
                    total,
                })
                .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceConfig;
    use mockito::{Matcher, Server, ServerGuard};
    use std::path::Path;

    const GRID: &str = r#"<form><input type="checkbox" value="alta"></form>"#;

    const DREAMS: &str = r#"<html><body>
        <h4>Alta: a detailed dreamer</h4>
        <p>2 dreams in series, 2 displayed</p>
        <span>#1 (1985-03-02) I was on a train. (5 words)</span>
        <span>#2 I was flying. (3 words)</span>
    </body></html>"#;

    const INFO: &str = r#"<html><body>
        <b>Dream series:</b> Alta: a detailed dreamer<br>
        <b>Number of dreams:</b> 2<br>
        <b>Year:</b> 1985<br>
        <b>Sex of the dreamer(s):</b> female<br>
        An adult woman.
        <a href="more_info.cgi?series=alta&further=1">For the further analyses, click here.</a>
        <a href="search.cgi">[Back to search form]</a>
    </body></html>"#;

    const MORE_INFO: &str = r#"<html><body>
        <h3>Demographics</h3>
        Age: 30<br>
        [Back to search form]
    </body></html>"#;

    async fn mock_site(server: &mut ServerGuard) -> Vec<mockito::Mock> {
        vec![
            server
                .mock("GET", "/grid.cgi")
                .with_body(GRID)
                .create_async()
                .await,
            server
                .mock("GET", "/random_sample.cgi")
                .match_query(Matcher::UrlEncoded("series".into(), "alta".into()))
                .with_body(DREAMS)
                .create_async()
                .await,
            server
                .mock("GET", "/more_info.cgi")
                .match_query(Matcher::AllOf(vec![
                    Matcher::UrlEncoded("series".into(), "alta".into()),
                    Matcher::UrlEncoded("further".into(), "1".into()),
                ]))
                .with_body(MORE_INFO)
                .create_async()
                .await,
            server
                .mock("GET", "/more_info.cgi")
                .match_query(Matcher::Exact("series=alta".into()))
                .with_body(INFO)
                .create_async()
                .await,
        ]
    }

    fn config(server: &ServerGuard, root: &Path) -> CurationConfig {
        let source = SourceConfig::builder()
            .base_url(server.url())
            .cache_dir(root.join("cache"))
            .requests_per_minute(6000)
            .grid_hash(None)
            .build();
        CurationConfig::builder()
            .source(source)
            .data_dir(root.join("datasets"))
            .source_registry_path(root.join("registry-source.txt"))
            .curated_registry_path(root.join("registry.txt"))
            .build()
    }

    #[test]
    fn test_step_parsing() {
        assert_eq!("source".parse::<Step>().unwrap(), Step::Source);
        assert_eq!("tsv".parse::<Step>().unwrap(), Step::Tables);
        assert!("source_pkg".parse::<Step>().is_err());
    }

    #[tokio::test]
    async fn test_full_pipeline() {
        let mut server = Server::new_async().await;
        let _mocks = mock_site(&mut server).await;
        let dir = tempfile::tempdir().unwrap();

        let (sender, mut receiver) = mpsc::channel(16);
        let curator = Curator::new(config(&server, dir.path()))
            .unwrap()
            .with_progress(sender);

        let summary = curator
            .run(&[Step::Tables, Step::Source])
            .await
            .unwrap();
        assert_eq!(
            summary,
            CurationSummary {
                datasets: 1,
                source_files: 3,
                dreams: 2,
            }
        );

        let source = Registry::load(&dir.path().join("registry-source.txt"))
            .await
            .unwrap();
        let fnames: Vec<_> = source.entries().iter().map(|e| e.fname.as_str()).collect();
        assert_eq!(
            fnames,
            vec!["alta/dreams.html", "alta/info.html", "alta/moreinfo.html"]
        );

        let curated = Registry::load(&dir.path().join("registry.txt")).await.unwrap();
        assert_eq!(curated.dataset_ids(), vec!["alta"]);
        assert!(curated.get("alta.tsv").is_some());
        assert!(curated.get("alta.json").is_some());

        let json = tokio::fs::read_to_string(dir.path().join("datasets/alta.json"))
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["details"][0]["title"], "Demographics");
        assert_eq!(value["details"][0]["fields"][0]["name"], "Age");

        let mut steps = Vec::new();
        while let Ok(progress) = receiver.try_recv() {
            steps.push(progress.step);
        }
        assert_eq!(steps, vec![Step::Source, Step::Tables]);
    }

    #[tokio::test]
    async fn test_tables_require_source_registry() {
        let server = Server::new_async().await;
        let dir = tempfile::tempdir().unwrap();
        let curator = Curator::new(config(&server, dir.path())).unwrap();

        let result = curator.curate_dataset("alta").await;
        assert!(matches!(result, Err(Error::Registry(_))));
    }

    #[tokio::test]
    async fn test_existing_outputs_are_kept() {
        let mut server = Server::new_async().await;
        let _mocks = mock_site(&mut server).await;
        let dir = tempfile::tempdir().unwrap();

        let curator = Curator::new(config(&server, dir.path())).unwrap();
        curator.run(&[Step::Source, Step::Tables]).await.unwrap();

        let again = curator.run(&[Step::Source]).await;
        assert!(matches!(again, Err(Error::AlreadyExists(_))));

        let overwriting = Curator::new(CurationConfig {
            overwrite: true,
            ..config(&server, dir.path())
        })
        .unwrap();
        tokio_test::assert_ok!(overwriting.run(&[Step::Source, Step::Tables]).await);
    }
}
