//! Collection engine: chunked fetching, merging, rate limiting, and the
//! orchestrating [`Collector`].

/// Orchestration of fetch, merge, write, checkpoint
pub mod engine;

/// Per-chunk fetching with error isolation
pub mod fetch;

/// Merging chunk batches into one ordered series
pub mod merge;

/// Request pacing policies
pub mod rate_limit;

pub use engine::{CollectError, CollectOutcome, Collector, UnitStatus};
pub use fetch::{ChunkFetcher, FetchReport};
pub use merge::merge_chunks;
pub use rate_limit::{RateLimiter, RatePolicy};
