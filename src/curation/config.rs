//! # Curation Configuration
//!
//! Where curated files and registries are written, and how. Wraps the
//! `SourceConfig` used to reach the site.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::Error;
use crate::source::SourceConfig;

/// Delimiter of the curated dream tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TableFormat {
    /// Tab separated, `.tsv`
    #[default]
    Tsv,
    /// Comma separated, `.csv`
    Csv,
}

impl TableFormat {
    pub fn delimiter(self) -> u8 {
        match self {
            TableFormat::Tsv => b'\t',
            TableFormat::Csv => b',',
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            TableFormat::Tsv => "tsv",
            TableFormat::Csv => "csv",
        }
    }

    /// Format implied by a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()?.to_str()?.parse().ok()
    }
}

impl FromStr for TableFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tsv" => Ok(TableFormat::Tsv),
            "csv" => Ok(TableFormat::Csv),
            other => Err(Error::InvalidRequest(format!("Unknown table format: {}", other))),
        }
    }
}

/// Configuration for the curation pipeline
#[derive(Debug, Clone)]
pub struct CurationConfig {
    /// How to reach the source site
    pub source: SourceConfig,

    /// Directory for curated tables and JSON files
    pub data_dir: PathBuf,

    /// Registry of the source HTML pages
    pub source_registry_path: PathBuf,

    /// Registry of the curated files
    pub curated_registry_path: PathBuf,

    /// Replace existing output files
    pub overwrite: bool,

    /// Dream table delimiter
    pub table_format: TableFormat,

    /// Attach further-analyses sections to the info JSON
    pub include_details: bool,
}

impl Default for CurationConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            data_dir: PathBuf::from("datasets"),
            source_registry_path: PathBuf::from("registry-source.txt"),
            curated_registry_path: PathBuf::from("registry.txt"),
            overwrite: false,
            table_format: TableFormat::default(),
            include_details: true,
        }
    }
}

/// Builder for CurationConfig
#[derive(Debug, Default)]
pub struct CurationConfigBuilder {
    config: CurationConfig,
}

impl CurationConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: CurationConfig::default(),
        }
    }

    pub fn source(mut self, source: SourceConfig) -> Self {
        self.config.source = source;
        self
    }

    pub fn data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.config.data_dir = data_dir.into();
        self
    }

    pub fn source_registry_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.source_registry_path = path.into();
        self
    }

    pub fn curated_registry_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.curated_registry_path = path.into();
        self
    }

    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.config.overwrite = overwrite;
        self
    }

    pub fn table_format(mut self, table_format: TableFormat) -> Self {
        self.config.table_format = table_format;
        self
    }

    pub fn include_details(mut self, include_details: bool) -> Self {
        self.config.include_details = include_details;
        self
    }

    pub fn build(self) -> CurationConfig {
        self.config
    }
}

impl CurationConfig {
    pub fn builder() -> CurationConfigBuilder {
        CurationConfigBuilder::new()
    }

    /// Curated dream table of a series
    pub fn table_path(&self, dataset: &str) -> PathBuf {
        self.data_dir
            .join(format!("{}.{}", dataset, self.table_format.extension()))
    }

    /// Curated info JSON of a series
    pub fn info_path(&self, dataset: &str) -> PathBuf {
        self.data_dir.join(format!("{}.json", dataset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_follow_format() {
        let config = CurationConfig::builder()
            .data_dir("/data")
            .table_format(TableFormat::Csv)
            .build();
        assert_eq!(config.table_path("alta"), PathBuf::from("/data/alta.csv"));
        assert_eq!(config.info_path("alta"), PathBuf::from("/data/alta.json"));

        let default = CurationConfig::default();
        assert_eq!(default.table_path("alta"), PathBuf::from("datasets/alta.tsv"));
        assert!(!default.overwrite);
        assert!(default.include_details);
    }

    #[test]
    fn test_table_format_parsing() {
        assert_eq!("TSV".parse::<TableFormat>().unwrap(), TableFormat::Tsv);
        assert_eq!(
            TableFormat::from_path(Path::new("x/alta.csv")),
            Some(TableFormat::Csv)
        );
        assert_eq!(TableFormat::from_path(Path::new("alta.json")), None);
        assert!("xlsx".parse::<TableFormat>().is_err());
    }
}
