//! Capital.com API client for commodity CFD quotes.
//!
//! Market data endpoints require no authentication. Each price snapshot
//! carries separate bid and ask quotes; the record value is their midpoint,
//! with the raw quotes kept as auxiliary fields.

use async_trait::async_trait;
use chrono::{Duration, NaiveDateTime};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{info, warn};

use super::http::HttpClient;
use super::{ProviderError, ProviderLimits, ProviderResult, SeriesProvider};
use crate::chunk::TimeRange;
use crate::collector::rate_limit::RatePolicy;
use crate::Record;

/// Capital.com API base URL.
pub const CAPITAL_BASE_URL: &str = "https://api-capital.backend-capital.com/api/v1";

/// Maximum data points one request may return.
const MAX_API_POINTS: i64 = 10_000;

/// Maximum span per request, sized so hourly resolution stays well under
/// [`MAX_API_POINTS`].
const MAX_SPAN_DAYS: i64 = 30;

/// Minimum gap between requests (the API allows 10 requests per second).
const MIN_REQUEST_INTERVAL_MS: u64 = 100;

#[derive(Debug, Deserialize)]
struct PricesResponse {
    #[serde(default)]
    prices: Vec<PriceRow>,
}

#[derive(Debug, Deserialize)]
struct PriceRow {
    #[serde(rename = "snapshotTimeUTC")]
    snapshot_time_utc: String,
    #[serde(rename = "closePrice", default)]
    close_price: Option<PriceQuote>,
}

#[derive(Debug, Default, Deserialize)]
struct PriceQuote {
    #[serde(default)]
    bid: Option<Decimal>,
    #[serde(default)]
    ask: Option<Decimal>,
}

/// Client for the Capital.com market data API.
pub struct CapitalClient {
    http: HttpClient,
    base_url: String,
    resolution: String,
}

impl CapitalClient {
    /// Create a client with hourly resolution.
    pub fn new() -> ProviderResult<Self> {
        Self::with_base_url(CAPITAL_BASE_URL.to_string())
    }

    /// Create a client against a non-default base URL (used by tests).
    pub fn with_base_url(base_url: String) -> ProviderResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        Ok(Self {
            http: HttpClient::new(headers)?,
            base_url,
            resolution: "HOUR".to_string(),
        })
    }

    /// Override the price resolution (MINUTE, HOUR, DAY, WEEK).
    pub fn with_resolution(mut self, resolution: impl Into<String>) -> Self {
        self.resolution = resolution.into();
        self
    }

    /// Data points needed to cover `range` at the configured resolution,
    /// capped at the API maximum.
    fn max_points_for(&self, range: &TimeRange) -> i64 {
        let minutes = range.duration().num_minutes().max(1);
        let needed = match self.resolution.as_str() {
            "MINUTE" => minutes,
            "HOUR" => minutes / 60 + 1,
            "DAY" => minutes / (60 * 24) + 1,
            _ => 1000,
        };
        needed.min(MAX_API_POINTS)
    }
}

#[async_trait]
impl SeriesProvider for CapitalClient {
    fn name(&self) -> &str {
        "capital"
    }

    fn limits(&self) -> ProviderLimits {
        ProviderLimits {
            max_span: Duration::days(MAX_SPAN_DAYS),
            rate_policy: RatePolicy::MinInterval(std::time::Duration::from_millis(
                MIN_REQUEST_INTERVAL_MS,
            )),
        }
    }

    async fn fetch_range(
        &self,
        series_key: &str,
        range: &TimeRange,
    ) -> ProviderResult<Vec<Record>> {
        if series_key.trim().is_empty() {
            return Err(ProviderError::InvalidKey("empty epic".to_string()));
        }

        let url = format!("{}/prices/{}", self.base_url, series_key);
        let params = [
            ("resolution", self.resolution.clone()),
            ("max", self.max_points_for(range).to_string()),
            ("from", range.start().format("%Y-%m-%dT%H:%M:%S").to_string()),
            ("to", range.end().format("%Y-%m-%dT%H:%M:%S").to_string()),
        ];

        let response: PricesResponse = self.http.get_json(&url, &params).await?;

        let mut records = Vec::with_capacity(response.prices.len());
        for row in &response.prices {
            let timestamp =
                match NaiveDateTime::parse_from_str(&row.snapshot_time_utc, "%Y-%m-%dT%H:%M:%S") {
                    Ok(naive) => naive.and_utc(),
                    Err(e) => {
                        warn!(
                            epic = series_key,
                            raw = %row.snapshot_time_utc,
                            error = %e,
                            "skipping snapshot with unparseable timestamp"
                        );
                        continue;
                    }
                };

            let quote = row.close_price.as_ref();
            let bid = quote.and_then(|q| q.bid);
            let ask = quote.and_then(|q| q.ask);
            let value = match (bid, ask) {
                (Some(b), Some(a)) => (b + a) / Decimal::TWO,
                (Some(b), None) => b,
                (None, Some(a)) => a,
                (None, None) => {
                    warn!(epic = series_key, ts = %timestamp, "snapshot without quotes, skipping");
                    continue;
                }
            };

            let mut record = Record::new(series_key, timestamp, value);
            if let Some(b) = bid {
                record.extra.insert("bid".to_string(), b.to_string());
            }
            if let Some(a) = ask {
                record.extra.insert("ask".to_string(), a.to_string());
            }
            records.push(record);
        }

        info!(
            epic = series_key,
            range = %range,
            records = records.len(),
            "fetched price snapshots"
        );
        Ok(records)
    }
}
