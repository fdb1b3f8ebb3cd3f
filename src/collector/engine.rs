//! The collection engine: chunk, fetch, merge, write, checkpoint.

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info, warn};

use super::fetch::ChunkFetcher;
use super::merge::merge_chunks;
use crate::checkpoint::{run_id, CheckpointStore, RunCheckpoint};
use crate::chunk::{RangeError, TimeRange};
use crate::provider::SeriesProvider;
use crate::shutdown;
use crate::store::{RecordStore, StoreError};

/// Errors that fail a whole work unit.
///
/// Chunk fetch failures are not here: they are isolated and reported through
/// [`CollectOutcome::failed_chunks`].
#[derive(Debug, Error)]
pub enum CollectError {
    /// The requested range or chunk span is invalid
    #[error(transparent)]
    InvalidRange(#[from] RangeError),

    /// The batch write failed; nothing was committed and the unit is not
    /// checkpointed, so a future run retries it
    #[error("write failed: {0}")]
    Write(#[from] StoreError),
}

/// Terminal state of one work unit within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitStatus {
    /// All chunks attempted, merged series written, checkpoint marked.
    /// Some chunks may still have failed; see the outcome's failed chunks.
    Completed,
    /// Checkpoint already marked this unit complete; nothing was fetched
    Skipped,
    /// A shutdown request stopped the chunk loop; fetched data was written
    /// but the checkpoint was not marked, so the unit is retried whole on
    /// the next run
    Interrupted,
}

/// Result of collecting one work unit.
#[derive(Debug)]
pub struct CollectOutcome {
    /// Work unit this outcome describes
    pub series_key: String,
    /// Terminal state of the unit
    pub status: UnitStatus,
    /// Rows newly inserted by the batch write (updated rows not counted)
    pub inserted: u64,
    /// Records fetched across all successful chunks
    pub fetched: usize,
    /// Chunks attempted
    pub chunks_total: usize,
    /// Sub-ranges whose fetch failed; their data is absent, not zero-filled
    pub failed_chunks: Vec<TimeRange>,
    /// The range this run attempted to cover
    pub coverage: TimeRange,
}

/// Orchestrates collection of one or more work units over a time range.
///
/// Work units and their chunks are processed sequentially; the only waits
/// are rate limiting and the network calls themselves.
pub struct Collector {
    provider: Arc<dyn SeriesProvider>,
    store: RecordStore,
    checkpoints: CheckpointStore,
}

impl Collector {
    /// Create a collector over one provider, record store, and checkpoint
    /// directory.
    pub fn new(
        provider: Arc<dyn SeriesProvider>,
        store: RecordStore,
        checkpoints: CheckpointStore,
    ) -> Self {
        Self {
            provider,
            store,
            checkpoints,
        }
    }

    /// The record store this collector writes to.
    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Collect one work unit over `range`.
    ///
    /// With `resume`, a unit the run's checkpoint already marks complete is
    /// skipped without touching the provider. Chunk fetch failures are
    /// logged and reported in the outcome; only a failed batch write fails
    /// the unit.
    pub async fn collect(
        &self,
        series_key: &str,
        range: &TimeRange,
        resume: bool,
    ) -> Result<CollectOutcome, CollectError> {
        let run = run_id(self.provider.name(), range);
        let mut checkpoint = self.load_checkpoint(&run);

        if resume && checkpoint.is_complete(series_key) {
            info!(series_key, run = %run, "already complete, skipping");
            return Ok(CollectOutcome {
                series_key: series_key.to_string(),
                status: UnitStatus::Skipped,
                inserted: 0,
                fetched: 0,
                chunks_total: 0,
                failed_chunks: Vec::new(),
                coverage: range.clone(),
            });
        }

        let limits = self.provider.limits();
        let chunks = range.chunks(limits.max_span)?;
        info!(
            series_key,
            provider = self.provider.name(),
            range = %range,
            "collection started"
        );

        let fetcher = ChunkFetcher::new(Arc::clone(&self.provider));
        let report = fetcher.fetch_all(series_key, chunks).await;
        let fetched = report.fetched();
        let merged = merge_chunks(report.batches);

        let inserted = match self.store.upsert_batch(&merged).await {
            Ok(inserted) => inserted,
            Err(e) => {
                error!(series_key, error = %e, "batch write failed, unit not checkpointed");
                return Err(e.into());
            }
        };

        let status = if report.interrupted {
            UnitStatus::Interrupted
        } else {
            checkpoint.mark_complete(series_key);
            if let Err(e) = self.checkpoints.save(&checkpoint) {
                warn!(series_key, error = %e, "checkpoint write failed, unit will be redone");
            }
            UnitStatus::Completed
        };

        info!(
            series_key,
            fetched,
            inserted,
            chunks_failed = report.failed_chunks.len(),
            ?status,
            "collection finished"
        );

        Ok(CollectOutcome {
            series_key: series_key.to_string(),
            status,
            inserted,
            fetched,
            chunks_total: report.chunks_total,
            failed_chunks: report.failed_chunks,
            coverage: range.clone(),
        })
    }

    /// Collect several work units sequentially over the same range.
    ///
    /// A unit that fails is recorded and does not stop the others. A
    /// shutdown request stops before the next unit starts.
    pub async fn collect_many(
        &self,
        series_keys: &[String],
        range: &TimeRange,
        resume: bool,
    ) -> BTreeMap<String, Result<CollectOutcome, CollectError>> {
        let mut results = BTreeMap::new();
        for series_key in series_keys {
            if shutdown::is_shutdown_requested() {
                info!("shutdown requested, remaining work units left for next run");
                break;
            }
            let result = self.collect(series_key, range, resume).await;
            if let Err(e) = &result {
                warn!(series_key, error = %e, "work unit failed, continuing with next");
            }
            results.insert(series_key.clone(), result);
        }
        results
    }

    /// The range still missing for `series_key` ending at `end`.
    ///
    /// Starts at the latest stored timestamp (re-fetching the boundary row
    /// is harmless, the write is idempotent) or at `default_start` when the
    /// store has nothing yet. `None` when the store is already up to date.
    pub async fn incremental_range(
        &self,
        series_key: &str,
        default_start: chrono::DateTime<chrono::Utc>,
        end: chrono::DateTime<chrono::Utc>,
    ) -> Result<Option<TimeRange>, CollectError> {
        let start = self
            .store
            .read_latest_timestamp(series_key)
            .await?
            .unwrap_or(default_start);
        if start >= end {
            info!(series_key, latest = %start, "store already up to date");
            return Ok(None);
        }
        Ok(Some(TimeRange::new(start, end)?))
    }

    /// Checkpoint read failures degrade to a fresh checkpoint: the cost is
    /// redundant re-fetching, never wrong data.
    fn load_checkpoint(&self, run: &str) -> RunCheckpoint {
        match self.checkpoints.load(run) {
            Ok(checkpoint) => checkpoint,
            Err(e) => {
                warn!(run, error = %e, "checkpoint unreadable, treating run as fresh");
                RunCheckpoint::new(run)
            }
        }
    }
}
