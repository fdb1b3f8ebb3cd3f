//! Half-open time ranges and provider-sized chunking.
//!
//! Providers cap how much time a single request may cover, so a requested
//! range is split into an ordered sequence of contiguous sub-ranges no larger
//! than the provider's maximum span. The sub-ranges exactly cover the
//! original range: no gaps, no overlaps, final chunk possibly shorter.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Errors for range construction and chunking
#[derive(Debug, thiserror::Error)]
pub enum RangeError {
    /// Range start is not strictly before its end
    #[error("invalid range: start ({start}) must be before end ({end})")]
    InvalidRange {
        /// Requested start
        start: DateTime<Utc>,
        /// Requested end
        end: DateTime<Utc>,
    },

    /// Chunk span is zero or negative
    #[error("invalid max span: {0}")]
    InvalidSpan(String),
}

/// A half-open interval `[start, end)` of UTC timestamps.
///
/// Invariant: `start < end`, enforced at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeRange {
    /// Create a range, failing fast when `start >= end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, RangeError> {
        if start >= end {
            return Err(RangeError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Inclusive start of the range.
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Exclusive end of the range.
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Length of the range.
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Whether `ts` falls inside the half-open interval.
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts < self.end
    }

    /// Split into contiguous sub-ranges of at most `max_span` each.
    ///
    /// The returned iterator is lazy, finite, and restartable; chunks come
    /// out in chronological order, `chunk[i].end == chunk[i+1].start`, and
    /// together they exactly cover `self`. A range shorter than `max_span`
    /// yields itself as the only chunk.
    pub fn chunks(&self, max_span: Duration) -> Result<RangeChunks, RangeError> {
        if max_span <= Duration::zero() {
            return Err(RangeError::InvalidSpan(format!(
                "max span must be positive, got {max_span}"
            )));
        }
        Ok(RangeChunks {
            cursor: self.start,
            end: self.end,
            max_span,
        })
    }
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}

/// Iterator over the sub-ranges of a chunked [`TimeRange`].
#[derive(Debug, Clone)]
pub struct RangeChunks {
    cursor: DateTime<Utc>,
    end: DateTime<Utc>,
    max_span: Duration,
}

impl Iterator for RangeChunks {
    type Item = TimeRange;

    fn next(&mut self) -> Option<TimeRange> {
        if self.cursor >= self.end {
            return None;
        }
        let chunk_end = (self.cursor + self.max_span).min(self.end);
        let chunk = TimeRange {
            start: self.cursor,
            end: chunk_end,
        };
        self.cursor = chunk_end;
        Some(chunk)
    }
}
