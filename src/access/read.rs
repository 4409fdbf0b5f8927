//! Readers for curated files

use std::path::Path;

use csv::ReaderBuilder;
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::fs;

use crate::curation::{MISSING, TableFormat};
use crate::dataset::{DatasetInfo, DreamRecord, DreamTable};
use crate::error::{Error, Result};

#[derive(Debug, Deserialize)]
struct DreamRow {
    n: String,
    #[serde(default)]
    date: Option<String>,
    dream: String,
}

impl From<DreamRow> for DreamRecord {
    fn from(row: DreamRow) -> Self {
        DreamRecord {
            n: row.n,
            date: row
                .date
                .filter(|date| !date.is_empty() && date != MISSING),
            dream: row.dream,
        }
    }
}

/// Parse a curated dream table
///
/// The `date` column may be absent; `n/a` and empty dates read as missing.
pub fn dreams_from_bytes(dataset_id: &str, bytes: &[u8], format: TableFormat) -> Result<DreamTable> {
    let mut reader = ReaderBuilder::new()
        .delimiter(format.delimiter())
        .has_headers(true)
        .from_reader(bytes);

    let records = reader
        .deserialize::<DreamRow>()
        .map(|row| row.map(DreamRecord::from))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(DreamTable::new(dataset_id, records))
}

/// Read a curated dream table; the delimiter follows the file extension
pub async fn read_dreams_file(dataset_id: &str, path: &Path) -> Result<DreamTable> {
    let format = TableFormat::from_path(path).ok_or_else(|| {
        Error::InvalidRequest(format!("Not a dream table: {}", path.display()))
    })?;
    let bytes = fs::read(path).await?;
    dreams_from_bytes(dataset_id, &bytes, format)
}

/// Read curated series metadata
pub async fn read_info_file(path: &Path) -> Result<DatasetInfo> {
    let text = fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&text)?)
}

/// Read curated series metadata as an untyped JSON object
pub async fn read_info_map_file(path: &Path) -> Result<Map<String, Value>> {
    let text = fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&text)?)
}
