//! Checkpoint-based resume across runs.

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};

use energy_data_collector::checkpoint::CheckpointStore;
use energy_data_collector::chunk::TimeRange;
use energy_data_collector::collector::{Collector, UnitStatus};
use energy_data_collector::provider::SeriesProvider;
use energy_data_collector::store::RecordStore;

use crate::support::HourlyProvider;

fn day_range(from_day: u32, to_day: u32) -> TimeRange {
    TimeRange::new(
        Utc.with_ymd_and_hms(2024, 1, from_day, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 1, to_day, 0, 0, 0).unwrap(),
    )
    .unwrap()
}

#[tokio::test]
async fn resume_fetches_only_unfinished_units() {
    let dir = tempfile::tempdir().unwrap();
    let provider = Arc::new(HourlyProvider::new(Duration::days(10)));
    let store = RecordStore::in_memory().await.unwrap();
    let collector = Collector::new(
        Arc::clone(&provider) as Arc<dyn SeriesProvider>,
        store,
        CheckpointStore::new(dir.path()),
    );
    let range = day_range(1, 3);

    let keys: Vec<String> = vec!["A".into(), "B".into()];
    let results = collector.collect_many(&keys, &range, true).await;
    assert_eq!(results.len(), 2);
    assert!(results
        .values()
        .all(|r| r.as_ref().unwrap().status == UnitStatus::Completed));
    let calls_after_first_run = provider.call_count();

    let keys: Vec<String> = vec!["A".into(), "B".into(), "C".into()];
    let results = collector.collect_many(&keys, &range, true).await;
    assert_eq!(results["A"].as_ref().unwrap().status, UnitStatus::Skipped);
    assert_eq!(results["B"].as_ref().unwrap().status, UnitStatus::Skipped);
    assert_eq!(results["C"].as_ref().unwrap().status, UnitStatus::Completed);

    // only C hit the provider in the second run
    let fetched = provider.fetched_keys();
    assert!(fetched[calls_after_first_run..]
        .iter()
        .all(|key| key == "C"));
    assert!(fetched[calls_after_first_run..].iter().any(|key| key == "C"));
}

#[tokio::test]
async fn without_resume_completed_units_are_refetched() {
    let dir = tempfile::tempdir().unwrap();
    let provider = Arc::new(HourlyProvider::new(Duration::days(10)));
    let store = RecordStore::in_memory().await.unwrap();
    let collector = Collector::new(
        Arc::clone(&provider) as Arc<dyn SeriesProvider>,
        store,
        CheckpointStore::new(dir.path()),
    );
    let range = day_range(1, 2);
    let keys: Vec<String> = vec!["A".into()];

    collector.collect_many(&keys, &range, true).await;
    let calls_after_first_run = provider.call_count();

    let results = collector.collect_many(&keys, &range, false).await;
    assert_eq!(results["A"].as_ref().unwrap().status, UnitStatus::Completed);
    assert!(provider.call_count() > calls_after_first_run);
    // nothing new was inserted the second time around
    assert_eq!(results["A"].as_ref().unwrap().inserted, 0);
}

#[tokio::test]
async fn deleting_the_checkpoint_forces_a_fresh_run() {
    let dir = tempfile::tempdir().unwrap();
    let provider = Arc::new(HourlyProvider::new(Duration::days(10)));
    let store = RecordStore::in_memory().await.unwrap();
    let checkpoints = CheckpointStore::new(dir.path());
    let collector = Collector::new(Arc::clone(&provider) as Arc<dyn SeriesProvider>, store, checkpoints.clone());
    let range = day_range(1, 2);

    collector.collect("A", &range, true).await.unwrap();
    let skipped = collector.collect("A", &range, true).await.unwrap();
    assert_eq!(skipped.status, UnitStatus::Skipped);

    let run = energy_data_collector::checkpoint::run_id("hourly", &range);
    checkpoints.delete(&run).unwrap();

    let redone = collector.collect("A", &range, true).await.unwrap();
    assert_eq!(redone.status, UnitStatus::Completed);
}

#[tokio::test]
async fn checkpoints_are_scoped_to_their_range() {
    let dir = tempfile::tempdir().unwrap();
    let provider = Arc::new(HourlyProvider::new(Duration::days(10)));
    let store = RecordStore::in_memory().await.unwrap();
    let collector = Collector::new(
        Arc::clone(&provider) as Arc<dyn SeriesProvider>,
        store,
        CheckpointStore::new(dir.path()),
    );

    collector
        .collect("A", &day_range(1, 2), true)
        .await
        .unwrap();

    // a different range is a different run, so A is collected again
    let outcome = collector
        .collect("A", &day_range(2, 3), true)
        .await
        .unwrap();
    assert_eq!(outcome.status, UnitStatus::Completed);
    assert_eq!(outcome.inserted, 24);
}
