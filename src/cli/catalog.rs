//! Catalog command implementation

use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use super::CliError;
use crate::catalog::{build_catalog, default_rules, write_catalog};
use crate::config::Config;
use crate::provider::esios::EsiosClient;
use crate::provider::ProviderError;

/// Arguments for the catalog command
#[derive(Debug, Parser)]
pub struct CatalogArgs {
    /// Output file; defaults to `<data dir>/indicators_catalog.json`
    #[arg(long)]
    pub output: Option<PathBuf>,
}

impl CatalogArgs {
    /// Fetch the ESIOS indicator listing, categorize it, and write the
    /// catalog JSON.
    pub async fn execute(&self, config: &Config) -> Result<(), CliError> {
        let token = config.esios_api_token.clone().ok_or_else(|| {
            ProviderError::MissingCredentials("ESIOS_API_TOKEN".to_string())
        })?;
        let client = EsiosClient::new(token)?;

        let indicators = client.list_indicators().await?;
        info!(count = indicators.len(), "indicator listing fetched");

        let catalog = build_catalog(&indicators, &default_rules());
        let path = self
            .output
            .clone()
            .unwrap_or_else(|| config.data_dir.join("indicators_catalog.json"));
        write_catalog(&catalog, &path)?;

        for (category, count) in &catalog.metadata.categories {
            info!(category, count, "category");
        }
        Ok(())
    }
}
