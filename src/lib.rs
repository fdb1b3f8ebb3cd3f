//! # Energy Data Collector Library
//!
//! A library for collecting historical energy-market and meteorological
//! time-series from remote HTTP APIs and persisting them into a relational
//! store for later analysis.
//!
//! ## Features
//!
//! - **Multi-Provider Support**: ESIOS electricity indicators, Capital.com
//!   commodity CFD quotes, and AEMET climatological records
//! - **Chunked Range Collection**: Arbitrary date ranges are split into
//!   provider-sized sub-ranges with no gaps and no overlaps
//! - **Resume Capability**: File-based checkpoints let interrupted runs skip
//!   already-completed series
//! - **Idempotent Storage**: Upsert-by-natural-key makes every run safe to
//!   replay without duplicating rows
//! - **Rate Limiting**: Per-provider request pacing (fixed interval or
//!   sliding per-minute budget)
//!
//! ## Quick Start
//!
//! ```no_run
//! use energy_data_collector::chunk::TimeRange;
//! use energy_data_collector::collector::Collector;
//! use energy_data_collector::checkpoint::CheckpointStore;
//! use energy_data_collector::provider::esios::EsiosClient;
//! use energy_data_collector::store::RecordStore;
//! use chrono::{TimeZone, Utc};
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let provider = Arc::new(EsiosClient::new("my-token".to_string())?);
//! let store = RecordStore::connect("sqlite://energy.db").await?;
//! let checkpoints = CheckpointStore::new("./checkpoints");
//!
//! let range = TimeRange::new(
//!     Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
//!     Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(),
//! )?;
//!
//! let collector = Collector::new(provider, store, checkpoints);
//! let outcome = collector.collect("600", &range, true).await?;
//! println!("inserted {} records", outcome.inserted);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`chunk`] - Half-open time ranges and the range chunker
//! - [`collector`] - Collection engine: chunk fetch, merge, rate limiting
//! - [`provider`] - Provider clients (ESIOS, Capital.com, AEMET)
//! - [`store`] - Idempotent relational record store
//! - [`checkpoint`] - Durable run-progress checkpoints
//! - [`catalog`] - Indicator categorization and catalog generation
//! - [`output`] - CSV export writers
//! - [`cli`] - Command-line interface
//!
//! ## Guarantees
//!
//! A run never corrupts previously stored data: chunk failures are additive
//! omissions and batch writes are transactional, so failures only ever result
//! in missing data, never wrong data.

#![warn(missing_docs)]
#![warn(clippy::all)]

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Indicator catalog generation and categorization
pub mod catalog;

/// Durable run-progress checkpoints
pub mod checkpoint;

/// Time ranges and range chunking
pub mod chunk;

/// CLI command implementations
pub mod cli;

/// Collection engine
pub mod collector;

/// Environment-backed configuration
pub mod config;

/// Data output writers
pub mod output;

/// Provider API clients
pub mod provider;

/// Graceful shutdown coordination shared across modules
pub mod shutdown;

/// Idempotent record persistence
pub mod store;

/// One time-series data point.
///
/// The natural key is `(series_key, timestamp)`; within a persisted series
/// for one work unit, natural keys are unique. Beyond the value itself, a
/// record carries a fixed set of named optional fields plus a small auxiliary
/// map for rarely-used provider-specific attributes (e.g. bid/ask quotes).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Record {
    /// Work unit key this record belongs to (indicator id, epic, station id)
    pub series_key: String,
    /// Observation timestamp (timezone-aware, stored as UTC)
    pub timestamp: DateTime<Utc>,
    /// Primary value
    pub value: Decimal,
    /// Lower bound, for indicators that report a min/max band
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_min: Option<Decimal>,
    /// Upper bound, for indicators that report a min/max band
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_max: Option<Decimal>,
    /// Geographic zone id, for geographically split indicators
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geo_id: Option<i64>,
    /// Geographic zone name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geo_name: Option<String>,
    /// Auxiliary provider-specific attributes (bid, ask, ...)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl Record {
    /// Create a record with only the natural key and value set.
    pub fn new(series_key: impl Into<String>, timestamp: DateTime<Utc>, value: Decimal) -> Self {
        Self {
            series_key: series_key.into(),
            timestamp,
            value,
            value_min: None,
            value_max: None,
            geo_id: None,
            geo_name: None,
            extra: BTreeMap::new(),
        }
    }
}
