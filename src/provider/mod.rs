//! Provider API clients.
//!
//! Each provider exposes the same capability to the collection engine: fetch
//! the records of one series for one bounded sub-range, plus the static
//! constraints (maximum span per request, request pacing) the engine must
//! respect when chunking and scheduling.

use crate::chunk::TimeRange;
use crate::collector::rate_limit::RatePolicy;
use crate::config::Config;
use crate::Record;
use async_trait::async_trait;
use chrono::Duration;
use std::str::FromStr;

pub mod aemet;
pub mod capital;
pub mod esios;
pub mod http;

/// Provider errors
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(String),

    /// Response could not be parsed
    #[error("parse error: {0}")]
    Parse(String),

    /// Provider returned an error status or payload
    #[error("API error: {0}")]
    Api(String),

    /// Provider rejected the request rate
    #[error("rate limit exceeded")]
    RateLimited,

    /// Required credential is missing or empty
    #[error("missing credentials: {0}")]
    MissingCredentials(String),

    /// Series key does not fit the provider's key format
    #[error("invalid series key: {0}")]
    InvalidKey(String),
}

/// Result type for provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Static request constraints of one provider.
#[derive(Debug, Clone, Copy)]
pub struct ProviderLimits {
    /// Maximum time span one request may cover
    pub max_span: Duration,
    /// Request pacing the provider enforces
    pub rate_policy: RatePolicy,
}

/// A remote time-series source.
///
/// Implementations issue one HTTP call (or more, where the provider requires
/// an indirection) per invocation of [`fetch_range`](Self::fetch_range) and
/// normalize the payload into [`Record`]s. An empty result means "no data in
/// this sub-range" and is not an error.
#[async_trait]
pub trait SeriesProvider: Send + Sync {
    /// Short provider name used in logs and reports.
    fn name(&self) -> &str;

    /// The provider's request constraints.
    fn limits(&self) -> ProviderLimits;

    /// Fetch all records of `series_key` within `range`.
    async fn fetch_range(&self, series_key: &str, range: &TimeRange)
        -> ProviderResult<Vec<Record>>;
}

/// Supported providers, as named on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// ESIOS electricity market indicators (Red Eléctrica de España)
    Esios,
    /// Capital.com commodity CFD quotes
    Capital,
    /// AEMET climatological records
    Aemet,
}

impl ProviderKind {
    /// All supported providers.
    pub const ALL: [ProviderKind; 3] =
        [ProviderKind::Esios, ProviderKind::Capital, ProviderKind::Aemet];
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "esios" => Ok(ProviderKind::Esios),
            "capital" => Ok(ProviderKind::Capital),
            "aemet" => Ok(ProviderKind::Aemet),
            _ => Err(format!(
                "unknown provider: {s}. Valid options: esios, capital, aemet"
            )),
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ProviderKind::Esios => "esios",
            ProviderKind::Capital => "capital",
            ProviderKind::Aemet => "aemet",
        };
        write!(f, "{s}")
    }
}

/// Create a provider client from its kind and the ambient configuration.
///
/// # Errors
/// Returns [`ProviderError::MissingCredentials`] when the provider requires a
/// token that is not configured.
pub fn create_provider(
    kind: ProviderKind,
    config: &Config,
) -> ProviderResult<Box<dyn SeriesProvider>> {
    match kind {
        ProviderKind::Esios => {
            let token = config
                .esios_api_token
                .clone()
                .ok_or_else(|| ProviderError::MissingCredentials("ESIOS_API_TOKEN".to_string()))?;
            Ok(Box::new(esios::EsiosClient::new(token)?))
        }
        ProviderKind::Capital => Ok(Box::new(capital::CapitalClient::new()?)),
        ProviderKind::Aemet => {
            let token = config
                .aemet_api_token
                .clone()
                .ok_or_else(|| ProviderError::MissingCredentials("AEMET_API_TOKEN".to_string()))?;
            Ok(Box::new(aemet::AemetClient::new(token)?))
        }
    }
}
