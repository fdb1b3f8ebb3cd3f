//! Per-chunk fetching with error isolation.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::rate_limit::RateLimiter;
use crate::chunk::{RangeChunks, TimeRange};
use crate::provider::SeriesProvider;
use crate::shutdown;
use crate::Record;

/// Result of fetching every chunk of one work unit.
#[derive(Debug)]
pub struct FetchReport {
    /// Per-chunk record batches, in chunk order. Failed chunks contribute
    /// no batch.
    pub batches: Vec<Vec<Record>>,
    /// Number of chunks attempted.
    pub chunks_total: usize,
    /// Sub-ranges whose fetch failed.
    pub failed_chunks: Vec<TimeRange>,
    /// True when a shutdown request interrupted the chunk loop.
    pub interrupted: bool,
}

impl FetchReport {
    /// Total records fetched across all successful chunks.
    pub fn fetched(&self) -> usize {
        self.batches.iter().map(Vec::len).sum()
    }
}

/// Fetches every chunk of a range sequentially, isolating failures.
///
/// A chunk whose fetch fails is logged and recorded in the report; it never
/// aborts the remaining chunks. Requests are paced by the provider's rate
/// policy.
pub struct ChunkFetcher {
    provider: Arc<dyn SeriesProvider>,
    limiter: RateLimiter,
}

impl ChunkFetcher {
    /// Create a fetcher paced by the provider's declared rate policy.
    pub fn new(provider: Arc<dyn SeriesProvider>) -> Self {
        let limiter = RateLimiter::new(provider.limits().rate_policy);
        Self { provider, limiter }
    }

    /// Fetch all `chunks` of `series_key` in chronological order.
    pub async fn fetch_all(&self, series_key: &str, chunks: RangeChunks) -> FetchReport {
        let mut report = FetchReport {
            batches: Vec::new(),
            chunks_total: 0,
            failed_chunks: Vec::new(),
            interrupted: false,
        };

        for chunk in chunks {
            if shutdown::is_shutdown_requested() {
                info!(series_key, "shutdown requested, stopping chunk loop");
                report.interrupted = true;
                break;
            }

            report.chunks_total += 1;
            self.limiter.acquire().await;
            debug!(series_key, chunk = %chunk, "fetching chunk");

            match self.provider.fetch_range(series_key, &chunk).await {
                Ok(mut batch) => {
                    // providers with inclusive end bounds may echo the row at
                    // chunk.end(); keep the series half-open
                    batch.retain(|record| chunk.contains(record.timestamp));
                    debug!(series_key, chunk = %chunk, records = batch.len(), "chunk fetched");
                    report.batches.push(batch);
                }
                Err(e) => {
                    warn!(
                        series_key,
                        chunk = %chunk,
                        error = %e,
                        "chunk fetch failed, continuing with next chunk"
                    );
                    report.failed_chunks.push(chunk);
                }
            }
        }

        report
    }
}
