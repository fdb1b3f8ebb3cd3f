//! End-to-end collection flow against a scripted provider.

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};

use energy_data_collector::checkpoint::CheckpointStore;
use energy_data_collector::chunk::TimeRange;
use energy_data_collector::collector::{Collector, UnitStatus};
use energy_data_collector::store::RecordStore;

use crate::support::HourlyProvider;

async fn collector_with(
    provider: Arc<HourlyProvider>,
    checkpoint_dir: &std::path::Path,
) -> Collector {
    let store = RecordStore::in_memory().await.unwrap();
    Collector::new(provider, store, CheckpointStore::new(checkpoint_dir))
}

#[tokio::test]
async fn nine_days_in_three_chunks_collects_216_hourly_records() {
    let dir = tempfile::tempdir().unwrap();
    let provider = Arc::new(HourlyProvider::new(Duration::days(3)));
    let collector = collector_with(Arc::clone(&provider), dir.path()).await;

    let range = TimeRange::new(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap(),
    )
    .unwrap();

    let outcome = collector.collect("600", &range, false).await.unwrap();
    assert_eq!(outcome.status, UnitStatus::Completed);
    assert_eq!(outcome.chunks_total, 3);
    assert!(outcome.failed_chunks.is_empty());
    assert_eq!(outcome.fetched, 216);
    assert_eq!(outcome.inserted, 216);

    let stored = collector.store().read_range("600", &range).await.unwrap();
    assert_eq!(stored.len(), 216);
    for pair in stored.windows(2) {
        assert!(pair[0].timestamp < pair[1].timestamp);
    }

    // identical second run: everything already stored
    let outcome = collector.collect("600", &range, false).await.unwrap();
    assert_eq!(outcome.status, UnitStatus::Completed);
    assert_eq!(outcome.fetched, 216);
    assert_eq!(outcome.inserted, 0);
    assert_eq!(collector.store().count_records("600").await.unwrap(), 216);
}

#[tokio::test]
async fn failed_chunk_leaves_gap_but_unit_completes() {
    let dir = tempfile::tempdir().unwrap();
    let failing_day = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    let provider = Arc::new(HourlyProvider::new(Duration::days(1)).failing_at(failing_day));
    let collector = collector_with(Arc::clone(&provider), dir.path()).await;

    let range = TimeRange::new(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 1, 6, 0, 0, 0).unwrap(),
    )
    .unwrap();

    let outcome = collector.collect("600", &range, false).await.unwrap();
    assert_eq!(outcome.status, UnitStatus::Completed);
    assert_eq!(outcome.chunks_total, 5);
    assert_eq!(outcome.failed_chunks.len(), 1);
    assert_eq!(outcome.failed_chunks[0].start(), failing_day);
    // four surviving days of hourly data
    assert_eq!(outcome.inserted, 96);

    let stored = collector.store().read_range("600", &range).await.unwrap();
    assert_eq!(stored.len(), 96);
    // the failed day is absent, not zero-filled
    assert!(stored.iter().all(|r| {
        r.timestamp < failing_day || r.timestamp >= failing_day + Duration::days(1)
    }));
    // neighbors of the failed chunk are intact
    assert!(stored
        .iter()
        .any(|r| r.timestamp == Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap()));
}

#[tokio::test]
async fn incremental_range_starts_at_latest_stored_timestamp() {
    let dir = tempfile::tempdir().unwrap();
    let provider = Arc::new(HourlyProvider::new(Duration::days(3)));
    let collector = collector_with(Arc::clone(&provider), dir.path()).await;

    let default_start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let first_end = Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap();
    let range = TimeRange::new(default_start, first_end).unwrap();
    collector.collect("600", &range, false).await.unwrap();

    let later_end = Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap();
    let next = collector
        .incremental_range("600", default_start, later_end)
        .await
        .unwrap()
        .unwrap();
    // resumes at the last stored hour; the overlap row is idempotent
    assert_eq!(
        next.start(),
        Utc.with_ymd_and_hms(2024, 1, 2, 23, 0, 0).unwrap()
    );
    assert_eq!(next.end(), later_end);

    // store already up to date: nothing to collect
    let up_to_date = collector
        .incremental_range("600", default_start, default_start + Duration::hours(1))
        .await
        .unwrap();
    assert!(up_to_date.is_none());
}
