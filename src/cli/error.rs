//! CLI error types and conversions

use crate::catalog::CatalogError;
use crate::checkpoint::CheckpointError;
use crate::chunk::RangeError;
use crate::collector::CollectError;
use crate::output::OutputError;
use crate::provider::ProviderError;
use crate::store::StoreError;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Range error
    #[error("range error: {0}")]
    Range(#[from] RangeError),

    /// Collection error
    #[error("collection error: {0}")]
    Collect(#[from] CollectError),

    /// Provider error
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Store error
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Checkpoint error
    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),

    /// Output error
    #[error("output error: {0}")]
    Output(#[from] OutputError),

    /// Catalog error
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Invalid argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
