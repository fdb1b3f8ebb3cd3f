//! ESIOS API client (Red Eléctrica de España).
//!
//! Retrieves day-ahead electricity market indicators. Authentication uses a
//! free personal token sent in the `x-api-key` header. The API caps request
//! spans generously but throttles aggressively, so the limiter budget is the
//! binding constraint in practice.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, HOST};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{info, warn};

use super::http::HttpClient;
use super::{ProviderError, ProviderLimits, ProviderResult, SeriesProvider};
use crate::chunk::TimeRange;
use crate::collector::rate_limit::RatePolicy;
use crate::Record;

/// ESIOS API base URL.
pub const ESIOS_BASE_URL: &str = "https://api.esios.ree.es";

/// Maximum span per request. The API accepts up to a year; 90 days keeps
/// individual responses small enough to survive transient failures.
const MAX_SPAN_DAYS: i64 = 90;

/// Conservative request budget per sliding minute.
const REQUESTS_PER_MINUTE: u32 = 50;

/// Metadata of one indicator from the listing endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct IndicatorInfo {
    /// Indicator id, used as the series key
    pub id: i64,
    /// Full indicator name
    pub name: String,
    /// Short display name
    #[serde(default)]
    pub short_name: Option<String>,
    /// Free-text description (HTML in practice)
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IndicatorListResponse {
    #[serde(default)]
    indicators: Vec<IndicatorInfo>,
}

#[derive(Debug, Deserialize)]
struct IndicatorDataResponse {
    indicator: IndicatorPayload,
}

#[derive(Debug, Deserialize)]
struct IndicatorPayload {
    #[serde(default)]
    values: Vec<IndicatorValueRow>,
}

#[derive(Debug, Deserialize)]
struct IndicatorValueRow {
    #[serde(default)]
    datetime_utc: Option<String>,
    #[serde(default)]
    datetime: Option<String>,
    value: Decimal,
    #[serde(default)]
    geo_id: Option<i64>,
    #[serde(default)]
    geo_name: Option<String>,
}

/// Client for the ESIOS API.
pub struct EsiosClient {
    http: HttpClient,
    base_url: String,
}

impl EsiosClient {
    /// Create a client authenticated with `token`.
    ///
    /// # Errors
    /// Returns [`ProviderError::MissingCredentials`] when the token is empty.
    pub fn new(token: String) -> ProviderResult<Self> {
        Self::with_base_url(token, ESIOS_BASE_URL.to_string())
    }

    /// Create a client against a non-default base URL (used by tests).
    pub fn with_base_url(token: String, base_url: String) -> ProviderResult<Self> {
        if token.trim().is_empty() {
            return Err(ProviderError::MissingCredentials(
                "ESIOS_API_TOKEN is empty; get a free token at https://www.esios.ree.es"
                    .to_string(),
            ));
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(HOST, HeaderValue::from_static("api.esios.ree.es"));
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(&token).map_err(|e| ProviderError::Http(e.to_string()))?,
        );

        Ok(Self {
            http: HttpClient::new(headers)?,
            base_url,
        })
    }

    /// List the indicators the API knows about.
    pub async fn list_indicators(&self) -> ProviderResult<Vec<IndicatorInfo>> {
        let url = format!("{}/indicators", self.base_url);
        let response: IndicatorListResponse = self.http.get_json(&url, &[]).await?;
        info!(count = response.indicators.len(), "retrieved indicator listing");
        Ok(response.indicators)
    }

    fn parse_row_timestamp(row: &IndicatorValueRow) -> ProviderResult<DateTime<Utc>> {
        let raw = row
            .datetime_utc
            .as_deref()
            .or(row.datetime.as_deref())
            .ok_or_else(|| ProviderError::Parse("value row without datetime".to_string()))?;
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| ProviderError::Parse(format!("bad datetime {raw}: {e}")))
    }
}

#[async_trait]
impl SeriesProvider for EsiosClient {
    fn name(&self) -> &str {
        "esios"
    }

    fn limits(&self) -> ProviderLimits {
        ProviderLimits {
            max_span: Duration::days(MAX_SPAN_DAYS),
            rate_policy: RatePolicy::PerMinute(REQUESTS_PER_MINUTE),
        }
    }

    async fn fetch_range(
        &self,
        series_key: &str,
        range: &TimeRange,
    ) -> ProviderResult<Vec<Record>> {
        let indicator_id: i64 = series_key
            .parse()
            .map_err(|_| ProviderError::InvalidKey(format!("not an indicator id: {series_key}")))?;

        let url = format!("{}/indicators/{}", self.base_url, indicator_id);
        let params = [
            (
                "start_date",
                range.start().format("%Y-%m-%dT%H:%M:%S").to_string(),
            ),
            ("end_date", range.end().format("%Y-%m-%dT%H:%M:%S").to_string()),
            ("time_trunc", "hour".to_string()),
        ];

        let response: IndicatorDataResponse = self.http.get_json(&url, &params).await?;

        let mut records = Vec::with_capacity(response.indicator.values.len());
        for row in &response.indicator.values {
            let timestamp = match Self::parse_row_timestamp(row) {
                Ok(ts) => ts,
                Err(e) => {
                    warn!(indicator = indicator_id, error = %e, "skipping unparseable value row");
                    continue;
                }
            };
            let mut record = Record::new(series_key, timestamp, row.value);
            record.geo_id = row.geo_id;
            record.geo_name = row.geo_name.clone();
            records.push(record);
        }

        info!(
            indicator = indicator_id,
            range = %range,
            records = records.len(),
            "fetched indicator data"
        );
        Ok(records)
    }
}
