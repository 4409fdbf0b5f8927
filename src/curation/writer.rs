//! Serialization of parsed series to curated files

use std::path::Path;

use csv::{QuoteStyle, Terminator, WriterBuilder};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use tokio::fs;
use tracing::debug;

use crate::curation::TableFormat;
use crate::dataset::{DatasetInfo, DreamTable};
use crate::error::{Error, Result};

/// Placeholder for a missing value in curated tables
pub const MISSING: &str = "n/a";

/// Render a dream table as delimited text
///
/// Columns are `n`, `date`, `dream`; `date` is left out when no dream in
/// the series is dated. Every field is quoted, dream numbers included.
pub fn dreams_to_bytes(table: &DreamTable, format: TableFormat) -> Result<Vec<u8>> {
    let mut writer = WriterBuilder::new()
        .delimiter(format.delimiter())
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::Any(b'\n'))
        .double_quote(true)
        .from_writer(Vec::new());

    let with_dates = table.has_dates();
    if with_dates {
        writer.write_record(["n", "date", "dream"])?;
    } else {
        writer.write_record(["n", "dream"])?;
    }

    for record in table {
        if with_dates {
            let date = record.date.as_deref().unwrap_or(MISSING);
            writer.write_record([record.n.as_str(), date, record.dream.as_str()])?;
        } else {
            writer.write_record([record.n.as_str(), record.dream.as_str()])?;
        }
    }

    writer
        .into_inner()
        .map_err(|e| Error::Io(e.into_error()))
}

/// Render series metadata as JSON indented by four spaces
pub fn info_to_bytes(info: &DatasetInfo) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut buffer, PrettyFormatter::with_indent(b"    "));
    info.serialize(&mut serializer)?;
    Ok(buffer)
}

/// Write a dream table, refusing to replace an existing file unless asked
pub async fn write_dreams_table(
    table: &DreamTable,
    path: &Path,
    format: TableFormat,
    overwrite: bool,
) -> Result<()> {
    prepare_target(path, overwrite).await?;
    fs::write(path, dreams_to_bytes(table, format)?).await?;
    debug!("Wrote {} dreams to {}", table.len(), path.display());
    Ok(())
}

/// Write series metadata, refusing to replace an existing file unless asked
pub async fn write_info_json(info: &DatasetInfo, path: &Path, overwrite: bool) -> Result<()> {
    prepare_target(path, overwrite).await?;
    fs::write(path, info_to_bytes(info)?).await?;
    debug!("Wrote info for {} to {}", info.short_name, path.display());
    Ok(())
}

/// Fail on an existing file without `overwrite`, and create parent directories
pub(crate) async fn prepare_target(path: &Path, overwrite: bool) -> Result<()> {
    if !overwrite && fs::try_exists(path).await? {
        return Err(Error::AlreadyExists(path.to_path_buf()));
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    Ok(())
}
