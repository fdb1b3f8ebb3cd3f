//! CSV export of stored records.

use std::fs;
use std::path::PathBuf;

use chrono::SecondsFormat;
use tracing::info;

use super::OutputResult;
use crate::Record;

const HEADER: [&str; 7] = [
    "series_key",
    "timestamp",
    "value",
    "value_min",
    "value_max",
    "geo_id",
    "geo_name",
];

/// Writes record series as CSV files, one file per export.
pub struct CsvWriter {
    dir: PathBuf,
}

impl CsvWriter {
    /// A writer rooted at `dir`. The directory is created on first export.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Write `records` to `<dir>/<file_name>.csv` and return the full path.
    ///
    /// Auxiliary attributes are not exported; the CSV carries the fixed
    /// columns only.
    pub fn write_series(&self, file_name: &str, records: &[Record]) -> OutputResult<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!("{file_name}.csv"));

        let mut writer = csv::Writer::from_path(&path)?;
        writer.write_record(HEADER)?;
        for record in records {
            writer.write_record([
                record.series_key.as_str(),
                &record
                    .timestamp
                    .to_rfc3339_opts(SecondsFormat::Secs, true),
                &record.value.to_string(),
                &record
                    .value_min
                    .map(|d| d.to_string())
                    .unwrap_or_default(),
                &record
                    .value_max
                    .map(|d| d.to_string())
                    .unwrap_or_default(),
                &record.geo_id.map(|id| id.to_string()).unwrap_or_default(),
                record.geo_name.as_deref().unwrap_or(""),
            ])?;
        }
        writer.flush()?;

        info!(path = %path.display(), records = records.len(), "series exported");
        Ok(path)
    }
}

/// Build a safe export file name for one series and range.
pub fn export_file_name(provider: &str, series_key: &str, suffix: &str) -> String {
    let safe_key: String = series_key
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();
    format!("{provider}_{safe_key}_{suffix}")
}
