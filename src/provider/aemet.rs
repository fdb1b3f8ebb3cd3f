//! AEMET OpenData client for daily climate records.
//!
//! AEMET serves data in two steps: the catalogued endpoint returns a small
//! envelope containing a `datos` URL, and the actual payload is fetched from
//! that URL. Numeric fields arrive as strings with a comma decimal separator.

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{info, warn};

use super::http::HttpClient;
use super::{ProviderError, ProviderLimits, ProviderResult, SeriesProvider};
use crate::chunk::TimeRange;
use crate::collector::rate_limit::RatePolicy;
use crate::Record;

/// AEMET OpenData API base URL.
pub const AEMET_BASE_URL: &str = "https://opendata.aemet.es/opendata/api";

/// AEMET rejects climatology queries spanning more than six months.
const MAX_SPAN_DAYS: i64 = 180;

/// The free tier throttles aggressively; one request per second keeps well
/// inside it.
const MIN_REQUEST_INTERVAL_MS: u64 = 1000;

#[derive(Debug, Deserialize)]
struct DataEnvelope {
    estado: i32,
    #[serde(default)]
    datos: Option<String>,
    #[serde(default)]
    descripcion: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ClimateRow {
    fecha: String,
    #[serde(default)]
    indicativo: Option<String>,
    #[serde(default)]
    nombre: Option<String>,
    #[serde(default)]
    provincia: Option<String>,
    #[serde(default)]
    tmed: Option<String>,
    #[serde(default)]
    tmin: Option<String>,
    #[serde(default)]
    tmax: Option<String>,
    #[serde(default)]
    prec: Option<String>,
}

/// Parse an AEMET numeric string, which uses a comma as decimal separator.
/// Non-numeric sentinels like "Ip" (trace precipitation) yield `None`.
fn parse_comma_decimal(raw: &str) -> Option<Decimal> {
    raw.trim().replace(',', ".").parse::<Decimal>().ok()
}

/// Client for the AEMET OpenData API.
pub struct AemetClient {
    http: HttpClient,
    base_url: String,
}

impl AemetClient {
    /// Create a client authenticated with `api_key`.
    ///
    /// # Errors
    /// Returns [`ProviderError::MissingCredentials`] when the key is empty.
    pub fn new(api_key: String) -> ProviderResult<Self> {
        Self::with_base_url(api_key, AEMET_BASE_URL.to_string())
    }

    /// Create a client against a non-default base URL (used by tests).
    pub fn with_base_url(api_key: String, base_url: String) -> ProviderResult<Self> {
        if api_key.trim().is_empty() {
            return Err(ProviderError::MissingCredentials(
                "AEMET_API_TOKEN is empty; request a free key at https://opendata.aemet.es"
                    .to_string(),
            ));
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            HeaderName::from_static("api_key"),
            HeaderValue::from_str(&api_key)
                .map_err(|e| ProviderError::MissingCredentials(e.to_string()))?,
        );

        Ok(Self {
            http: HttpClient::new(headers)?,
            base_url,
        })
    }

    /// Resolve the two-step envelope: the first response only carries a URL
    /// pointing at the real payload.
    async fn fetch_rows(&self, url: &str) -> ProviderResult<Vec<ClimateRow>> {
        let envelope: DataEnvelope = self.http.get_json(url, &[]).await?;
        if envelope.estado == 404 {
            // no data for the requested window, not an error
            return Ok(Vec::new());
        }
        let datos = match envelope.datos {
            Some(datos) if envelope.estado == 200 => datos,
            _ => {
                return Err(ProviderError::Api(format!(
                    "estado {}: {}",
                    envelope.estado,
                    envelope
                        .descripcion
                        .unwrap_or_else(|| "missing datos URL".to_string()),
                )))
            }
        };
        self.http.get_json(&datos, &[]).await
    }

    fn build_record(series_key: &str, row: &ClimateRow) -> Option<Record> {
        let date = NaiveDate::parse_from_str(&row.fecha, "%Y-%m-%d").ok()?;
        let timestamp: DateTime<Utc> = date.and_hms_opt(0, 0, 0)?.and_utc();
        let value = row.tmed.as_deref().and_then(parse_comma_decimal)?;

        let mut record = Record::new(series_key, timestamp, value);
        record.value_min = row.tmin.as_deref().and_then(parse_comma_decimal);
        record.value_max = row.tmax.as_deref().and_then(parse_comma_decimal);
        record.geo_name = row.nombre.clone();
        if let Some(station) = &row.indicativo {
            record.extra.insert("station".to_string(), station.clone());
        }
        if let Some(provincia) = &row.provincia {
            record
                .extra
                .insert("provincia".to_string(), provincia.clone());
        }
        if let Some(prec) = row.prec.as_deref().and_then(parse_comma_decimal) {
            record.extra.insert("prec".to_string(), prec.to_string());
        }
        Some(record)
    }
}

#[async_trait]
impl SeriesProvider for AemetClient {
    fn name(&self) -> &str {
        "aemet"
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
            return Err(ProviderError::InvalidKey("empty station id".to_string()));
        }

        let url = format!(
            "{}/valores/climatologicos/diarios/datos/fechaini/{}/fechafin/{}/estacion/{}",
            self.base_url,
            range.start().format("%Y-%m-%dT00:00:00UTC"),
            range.end().format("%Y-%m-%dT23:59:59UTC"),
            series_key,
        );

        let rows = self.fetch_rows(&url).await?;
        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            match Self::build_record(series_key, row) {
                Some(record) => records.push(record),
                None => {
                    warn!(
                        station = series_key,
                        fecha = %row.fecha,
                        "skipping row without usable date or mean temperature"
                    );
                }
            }
        }

        info!(
            station = series_key,
            range = %range,
            records = records.len(),
            "fetched climate records"
        );
        Ok(records)
    }
}
