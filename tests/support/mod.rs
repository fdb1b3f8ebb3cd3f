//! Shared test doubles for integration tests.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Duration;
use rust_decimal::Decimal;

use energy_data_collector::chunk::TimeRange;
use energy_data_collector::collector::RatePolicy;
use energy_data_collector::provider::{
    ProviderError, ProviderLimits, ProviderResult, SeriesProvider,
};
use energy_data_collector::Record;

/// A provider that synthesizes one record per hour over any requested range.
///
/// Chunks whose start matches an entry in `fail_starts` fail with an HTTP
/// error. Every fetch call is logged so tests can assert what was (not)
/// fetched.
pub struct HourlyProvider {
    max_span: Duration,
    fail_starts: HashSet<chrono::DateTime<chrono::Utc>>,
    calls: Mutex<Vec<(String, TimeRange)>>,
}

impl HourlyProvider {
    pub fn new(max_span: Duration) -> Self {
        Self {
            max_span,
            fail_starts: HashSet::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Make every chunk starting at `start` fail.
    pub fn failing_at(mut self, start: chrono::DateTime<chrono::Utc>) -> Self {
        self.fail_starts.insert(start);
        self
    }

    /// Series keys fetched so far, in call order.
    pub fn fetched_keys(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Number of fetch calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl SeriesProvider for HourlyProvider {
    fn name(&self) -> &str {
        "hourly"
    }

    fn limits(&self) -> ProviderLimits {
        ProviderLimits {
            max_span: self.max_span,
            rate_policy: RatePolicy::MinInterval(std::time::Duration::ZERO),
        }
    }

    async fn fetch_range(
        &self,
        series_key: &str,
        range: &TimeRange,
    ) -> ProviderResult<Vec<Record>> {
        self.calls
            .lock()
            .unwrap()
            .push((series_key.to_string(), range.clone()));

        if self.fail_starts.contains(&range.start()) {
            return Err(ProviderError::Http("connection reset by peer".to_string()));
        }

        let mut records = Vec::new();
        let mut ts = range.start();
        while ts < range.end() {
            let hours = ts.timestamp() / 3600;
            records.push(Record::new(series_key, ts, Decimal::new(hours, 0)));
            ts = ts + Duration::hours(1);
        }
        Ok(records)
    }
}
