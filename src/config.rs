//! Environment-backed configuration.

use std::env;
use std::path::PathBuf;

use tracing::debug;

/// Default SQLite database location.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://energy.db";

/// Default checkpoint directory.
pub const DEFAULT_CHECKPOINT_DIR: &str = "checkpoints";

/// Default export directory.
pub const DEFAULT_DATA_DIR: &str = "data";

/// Runtime configuration, loaded from the environment (a `.env` file is
/// honored when present).
///
/// Provider tokens are optional here; each provider fails with a
/// missing-credentials error only when it is actually selected.
#[derive(Debug, Clone)]
pub struct Config {
    /// ESIOS API token (`ESIOS_API_TOKEN`)
    pub esios_api_token: Option<String>,
    /// AEMET OpenData API key (`AEMET_API_TOKEN`)
    pub aemet_api_token: Option<String>,
    /// Database URL (`DATABASE_URL`)
    pub database_url: String,
    /// Checkpoint directory (`CHECKPOINT_DIR`)
    pub checkpoint_dir: PathBuf,
    /// Export directory (`DATA_DIR`)
    pub data_dir: PathBuf,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Self {
        // a missing .env file is fine
        dotenvy::dotenv().ok();

        let config = Self {
            esios_api_token: non_empty_var("ESIOS_API_TOKEN"),
            aemet_api_token: non_empty_var("AEMET_API_TOKEN"),
            database_url: non_empty_var("DATABASE_URL")
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            checkpoint_dir: non_empty_var("CHECKPOINT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CHECKPOINT_DIR)),
            data_dir: non_empty_var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
        };
        debug!(
            database_url = %config.database_url,
            checkpoint_dir = %config.checkpoint_dir.display(),
            esios_token = config.esios_api_token.is_some(),
            aemet_token = config.aemet_api_token.is_some(),
            "configuration loaded"
        );
        config
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            esios_api_token: None,
            aemet_api_token: None,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            checkpoint_dir: PathBuf::from(DEFAULT_CHECKPOINT_DIR),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
