//! Data output writers.

use thiserror::Error;

/// CSV export of stored records
pub mod csv;

pub use csv::CsvWriter;

/// Errors raised by output writers.
#[derive(Debug, Error)]
pub enum OutputError {
    /// Filesystem failure
    #[error("output io error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV encoding failure
    #[error("csv error: {0}")]
    Csv(#[from] ::csv::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;
