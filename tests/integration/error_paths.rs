//! Write and checkpoint failure handling.

use std::fs;
use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};

use energy_data_collector::checkpoint::{run_id, CheckpointStore};
use energy_data_collector::chunk::TimeRange;
use energy_data_collector::collector::{CollectError, Collector, UnitStatus};
use energy_data_collector::provider::SeriesProvider;
use energy_data_collector::store::RecordStore;

use crate::support::HourlyProvider;

fn two_day_range() -> TimeRange {
    TimeRange::new(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap(),
    )
    .unwrap()
}

#[tokio::test]
async fn failed_write_fails_the_unit_and_skips_the_checkpoint() {
    let dir = tempfile::tempdir().unwrap();
    let provider = Arc::new(HourlyProvider::new(Duration::days(10)));
    let checkpoints = CheckpointStore::new(dir.path());
    let store = RecordStore::in_memory().await.unwrap();
    let collector = Collector::new(
        Arc::clone(&provider) as Arc<dyn SeriesProvider>,
        store.clone(),
        checkpoints.clone(),
    );
    let range = two_day_range();

    // every operation after this fails with a database error
    store.close().await;

    let result = collector.collect("A", &range, true).await;
    assert!(matches!(result, Err(CollectError::Write(_))));

    // the unit is not checkpointed, so a future run retries it
    let run = run_id("hourly", &range);
    assert!(!checkpoints.load(&run).unwrap().is_complete("A"));

    let calls_after_failure = provider.call_count();
    let fresh_store = RecordStore::in_memory().await.unwrap();
    let retry = Collector::new(Arc::clone(&provider) as Arc<dyn SeriesProvider>, fresh_store, checkpoints);
    let outcome = retry.collect("A", &range, true).await.unwrap();
    assert_eq!(outcome.status, UnitStatus::Completed);
    assert_eq!(outcome.inserted, 48);
    assert!(provider.call_count() > calls_after_failure);
}

#[tokio::test]
async fn failed_unit_does_not_stop_the_rest_of_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let provider = Arc::new(HourlyProvider::new(Duration::days(10)));
    let store = RecordStore::in_memory().await.unwrap();
    let collector = Collector::new(
        Arc::clone(&provider) as Arc<dyn SeriesProvider>,
        store.clone(),
        CheckpointStore::new(dir.path()),
    );
    store.close().await;

    let keys: Vec<String> = vec!["A".into(), "B".into()];
    let results = collector.collect_many(&keys, &two_day_range(), true).await;

    // both units were attempted and both failures were recorded
    assert_eq!(results.len(), 2);
    assert!(results
        .values()
        .all(|r| matches!(r, Err(CollectError::Write(_)))));
}

#[tokio::test]
async fn corrupt_checkpoint_degrades_to_a_fresh_run() {
    let dir = tempfile::tempdir().unwrap();
    let provider = Arc::new(HourlyProvider::new(Duration::days(10)));
    let store = RecordStore::in_memory().await.unwrap();
    let checkpoints = CheckpointStore::new(dir.path());
    let collector = Collector::new(Arc::clone(&provider) as Arc<dyn SeriesProvider>, store, checkpoints.clone());
    let range = two_day_range();

    let run = run_id("hourly", &range);
    fs::write(dir.path().join(format!("{run}.json")), "{not json").unwrap();

    // unreadable checkpoint means re-processing, not an error
    let outcome = collector.collect("A", &range, true).await.unwrap();
    assert_eq!(outcome.status, UnitStatus::Completed);
    assert!(provider.call_count() > 0);

    // completion overwrote the corrupt file with a valid checkpoint
    assert!(checkpoints.load(&run).unwrap().is_complete("A"));
    let skipped = collector.collect("A", &range, true).await.unwrap();
    assert_eq!(skipped.status, UnitStatus::Skipped);
}
