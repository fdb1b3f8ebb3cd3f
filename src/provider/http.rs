//! Shared HTTP helper for provider clients.
//!
//! Wraps reqwest with unified GET-and-deserialize handling and retry with
//! exponential backoff. Retries cover network errors, HTTP 5xx, and 429;
//! other 4xx statuses fail immediately.

use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

use super::{ProviderError, ProviderResult};

/// Maximum number of retries for a failed request.
pub const MAX_RETRIES: u32 = 5;

/// Initial backoff delay in milliseconds.
pub const INITIAL_BACKOFF_MS: u64 = 1000;

/// Maximum backoff delay in milliseconds.
pub const MAX_BACKOFF_MS: u64 = 30000;

/// Request timeout applied to every call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Exponential backoff delay for the given retry attempt (0-indexed).
pub fn calculate_backoff(retry_count: u32) -> Duration {
    let delay_ms = INITIAL_BACKOFF_MS.saturating_mul(2u64.saturating_pow(retry_count));
    Duration::from_millis(delay_ms.min(MAX_BACKOFF_MS))
}

/// HTTP client shared by the provider implementations.
///
/// Internal retries pace themselves with backoff only; they are not counted
/// against the provider's per-minute request budget, which the rate limiter
/// applies once per fetch before the first attempt.
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Build a client with the given default headers (auth tokens etc).
    ///
    /// # Errors
    /// Returns [`ProviderError::Http`] if the underlying client cannot be
    /// constructed.
    pub fn new(headers: reqwest::header::HeaderMap) -> ProviderResult<Self> {
        let client = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ProviderError::Http(e.to_string()))?;
        Ok(Self { client })
    }

    /// Execute a GET request and deserialize the JSON response.
    pub async fn get_json<T>(&self, url: &str, params: &[(&str, String)]) -> ProviderResult<T>
    where
        T: DeserializeOwned,
    {
        debug!(url = url, params = params.len(), "GET");

        let mut last_error = None;

        for attempt in 0..=MAX_RETRIES {
            let response = match self.client.get(url).query(params).send().await {
                Ok(resp) => resp,
                Err(e) => {
                    warn!(
                        attempt = attempt + 1,
                        max = MAX_RETRIES + 1,
                        error = %e,
                        "network error"
                    );
                    last_error = Some(ProviderError::Http(e.to_string()));
                    if attempt < MAX_RETRIES {
                        tokio::time::sleep(calculate_backoff(attempt)).await;
                        continue;
                    }
                    break;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 {
                warn!(attempt = attempt + 1, max = MAX_RETRIES + 1, "rate limited (429)");
                last_error = Some(ProviderError::RateLimited);
                if attempt < MAX_RETRIES {
                    tokio::time::sleep(calculate_backoff(attempt)).await;
                    continue;
                }
                break;
            }

            if status.is_server_error() {
                warn!(
                    attempt = attempt + 1,
                    max = MAX_RETRIES + 1,
                    status = status.as_u16(),
                    "server error"
                );
                last_error = Some(ProviderError::Api(format!("server error: {status}")));
                if attempt < MAX_RETRIES {
                    tokio::time::sleep(calculate_backoff(attempt)).await;
                    continue;
                }
                break;
            }

            if status.is_client_error() {
                // Non-retryable: bad key, bad params, expired token
                let body = response.text().await.unwrap_or_default();
                return Err(ProviderError::Api(format!(
                    "client error {status}: {body}"
                )));
            }

            return response
                .json::<T>()
                .await
                .map_err(|e| ProviderError::Parse(e.to_string()));
        }

        Err(last_error.unwrap_or_else(|| ProviderError::Http("request failed".to_string())))
    }
}
