//! Collect command implementation

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use super::CliError;
use crate::checkpoint::CheckpointStore;
use crate::chunk::TimeRange;
use crate::collector::{CollectOutcome, Collector, UnitStatus};
use crate::config::Config;
use crate::output::{csv::export_file_name, CsvWriter};
use crate::provider::{create_provider, ProviderKind};
use crate::shutdown;
use crate::store::RecordStore;

/// Historical energy and climate data collector
#[derive(Debug, Parser)]
#[command(name = "energy-data-collector", version, about)]
pub struct Cli {
    /// Command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Collect a time range of one or more series into the record store
    Collect(CollectArgs),
    /// Generate the ESIOS indicator catalog
    Catalog(super::CatalogArgs),
    /// List supported providers and their request limits
    Providers,
}

/// Arguments for the collect command
#[derive(Debug, Parser)]
pub struct CollectArgs {
    /// Data provider (esios, capital, aemet)
    #[arg(long)]
    pub provider: ProviderKind,

    /// Series keys to collect (indicator id, epic, or station id); repeatable
    #[arg(long = "series", required = true)]
    pub series: Vec<String>,

    /// Range start, YYYY-MM-DD or RFC3339. Ignored with --incremental when
    /// the store already has data for a series
    #[arg(long)]
    pub start: String,

    /// Range end (exclusive), YYYY-MM-DD or RFC3339
    #[arg(long)]
    pub end: String,

    /// Skip series the run's checkpoint already marks complete
    #[arg(long)]
    pub resume: bool,

    /// Start each series at its latest stored timestamp instead of --start
    #[arg(long)]
    pub incremental: bool,

    /// Export each collected series to CSV under the data directory
    #[arg(long)]
    pub export_csv: bool,
}

/// Parse a datetime from RFC3339, with or without a timezone designator
/// ("2024-01-01T00:00:00Z", "+01:00", or bare, assumed UTC).
fn try_parse_datetime_rfc3339(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(&format!("{input}Z")) {
        return Some(dt.with_timezone(&Utc));
    }
    None
}

/// Parse a range bound from YYYY-MM-DD or RFC3339 datetime format.
///
/// Date-only input means start-of-day UTC; the range end is exclusive, so
/// `--end 2024-01-10` covers through the last instant of January 9th.
pub fn parse_datetime_flexible(input: &str) -> Result<DateTime<Utc>, CliError> {
    if let Some(dt) = try_parse_datetime_rfc3339(input) {
        return Ok(dt);
    }

    let date = NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|e| CliError::InvalidArgument(format!("invalid date {input:?}: {e}")))?;
    let datetime = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| CliError::InvalidArgument(format!("invalid date {input:?}")))?;
    Ok(datetime.and_utc())
}

impl CollectArgs {
    /// Run the collect command.
    pub async fn execute(&self, config: &Config) -> Result<(), CliError> {
        let start = parse_datetime_flexible(&self.start)?;
        let end = parse_datetime_flexible(&self.end)?;
        let range = TimeRange::new(start, end)?;

        let provider = create_provider(self.provider, config)?;
        let store = RecordStore::connect(&config.database_url).await?;
        let checkpoints = CheckpointStore::new(&config.checkpoint_dir);
        let collector = Collector::new(Arc::from(provider), store, checkpoints);

        let progress = ProgressBar::new(self.series.len() as u64);
        progress.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} series {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
        );

        let mut failed_units = 0usize;
        for series_key in &self.series {
            if shutdown::is_shutdown_requested() {
                warn!("shutdown requested, remaining series left for next run");
                break;
            }
            progress.set_message(series_key.clone());

            let unit_range = if self.incremental {
                match collector.incremental_range(series_key, start, end).await? {
                    Some(range) => range,
                    None => {
                        info!(series_key, "already up to date");
                        progress.inc(1);
                        continue;
                    }
                }
            } else {
                range.clone()
            };

            match collector.collect(series_key, &unit_range, self.resume).await {
                Ok(outcome) => {
                    report_outcome(&outcome);
                    if self.export_csv && outcome.status != UnitStatus::Skipped {
                        self.export(&collector, config, series_key, &unit_range)
                            .await?;
                    }
                }
                Err(e) => {
                    warn!(series_key, error = %e, "series failed, continuing with next");
                    failed_units += 1;
                }
            }
            progress.inc(1);
        }
        progress.finish_and_clear();

        if failed_units > 0 {
            warn!(failed_units, "some series failed; re-run with --resume to retry");
        }
        Ok(())
    }

    async fn export(
        &self,
        collector: &Collector,
        config: &Config,
        series_key: &str,
        range: &TimeRange,
    ) -> Result<(), CliError> {
        let records = collector.store().read_range(series_key, range).await?;
        let writer = CsvWriter::new(&config.data_dir);
        let file_name = export_file_name(
            &self.provider.to_string(),
            series_key,
            &range.start().format("%Y%m%d").to_string(),
        );
        writer.write_series(&file_name, &records)?;
        Ok(())
    }
}

fn report_outcome(outcome: &CollectOutcome) {
    match outcome.status {
        UnitStatus::Skipped => {
            info!(series_key = %outcome.series_key, "skipped (already complete)");
        }
        _ => {
            info!(
                series_key = %outcome.series_key,
                inserted = outcome.inserted,
                fetched = outcome.fetched,
                chunks = outcome.chunks_total,
                chunks_failed = outcome.failed_chunks.len(),
                "series collected"
            );
            for chunk in &outcome.failed_chunks {
                warn!(
                    series_key = %outcome.series_key,
                    chunk = %chunk,
                    "chunk missing from this run; re-run to fill the gap"
                );
            }
        }
    }
}
