//! Durable run-progress checkpoints.
//!
//! A checkpoint records which work units a run has fully processed, so a
//! restarted run can skip them. One JSON file per run identifier, written
//! atomically (temp file, fsync, rename) under an advisory file lock.
//! Checkpoints are never rolled back automatically; deleting the file forces
//! a fresh run.

use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use fd_lock::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::chunk::TimeRange;

/// Errors raised while reading or writing checkpoints.
#[derive(Debug, Error)]
pub enum CheckpointError {
    /// Filesystem failure
    #[error("checkpoint io error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored checkpoint could not be parsed
    #[error("checkpoint parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Result type for checkpoint operations
pub type CheckpointResult<T> = Result<T, CheckpointError>;

/// Build the run identifier for one provider and requested range.
///
/// Runs over the same provider and range share a checkpoint, so a re-run
/// with `resume` picks up where the interrupted one stopped.
pub fn run_id(provider: &str, range: &TimeRange) -> String {
    format!(
        "{}_{}_{}",
        provider,
        range.start().format("%Y%m%d%H%M"),
        range.end().format("%Y%m%d%H%M"),
    )
}

/// Progress of one run: the set of completed work unit keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunCheckpoint {
    /// Identifier this checkpoint belongs to
    pub run_id: String,
    /// Work unit keys that completed
    pub completed: BTreeSet<String>,
    /// When the checkpoint was last written
    pub last_updated: DateTime<Utc>,
}

impl RunCheckpoint {
    /// A fresh checkpoint with nothing completed.
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            completed: BTreeSet::new(),
            last_updated: Utc::now(),
        }
    }

    /// Whether `series_key` has already completed in this run.
    pub fn is_complete(&self, series_key: &str) -> bool {
        self.completed.contains(series_key)
    }

    /// Record `series_key` as completed. Idempotent.
    pub fn mark_complete(&mut self, series_key: &str) {
        self.completed.insert(series_key.to_string());
        self.last_updated = Utc::now();
    }
}

/// File-backed store of [`RunCheckpoint`]s, one JSON file per run.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    dir: PathBuf,
}

impl CheckpointStore {
    /// A store rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, run_id: &str) -> PathBuf {
        self.dir.join(format!("{run_id}.json"))
    }

    /// Load the checkpoint for `run_id`, or a fresh empty one if none was
    /// ever written.
    pub fn load(&self, run_id: &str) -> CheckpointResult<RunCheckpoint> {
        let path = self.path_for(run_id);
        if !path.exists() {
            debug!(run_id, "no checkpoint on disk, starting fresh");
            return Ok(RunCheckpoint::new(run_id));
        }
        let raw = fs::read_to_string(&path)?;
        let checkpoint = serde_json::from_str(&raw)?;
        info!(run_id, path = %path.display(), "loaded checkpoint");
        Ok(checkpoint)
    }

    /// Persist `checkpoint` durably.
    ///
    /// The JSON is written to a temp file, fsynced, then renamed over the
    /// final path, so readers never observe a half-written checkpoint. An
    /// advisory lock on a sibling `.lock` file serializes writers.
    pub fn save(&self, checkpoint: &RunCheckpoint) -> CheckpointResult<()> {
        fs::create_dir_all(&self.dir)?;

        let lock_path = self.dir.join(format!("{}.lock", checkpoint.run_id));
        let mut lock = RwLock::new(File::create(&lock_path)?);
        let _guard = lock.write()?;

        let path = self.path_for(&checkpoint.run_id);
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        serde_json::to_writer_pretty(&mut tmp, checkpoint)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| e.error)?;

        debug!(
            run_id = %checkpoint.run_id,
            completed = checkpoint.completed.len(),
            "checkpoint saved"
        );
        Ok(())
    }

    /// Remove the checkpoint for `run_id`, forcing the next run to start
    /// fresh. Missing files are fine.
    pub fn delete(&self, run_id: &str) -> CheckpointResult<()> {
        let path = self.path_for(run_id);
        match fs::remove_file(&path) {
            Ok(()) => {
                info!(run_id, "checkpoint deleted");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
