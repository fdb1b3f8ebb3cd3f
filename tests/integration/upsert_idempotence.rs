//! Idempotent upsert behavior of the record store.

use chrono::{Duration, TimeZone, Utc};
use rust_decimal::Decimal;

use energy_data_collector::chunk::TimeRange;
use energy_data_collector::store::RecordStore;
use energy_data_collector::Record;

fn hourly_batch(series_key: &str, hours: u32) -> Vec<Record> {
    let start = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
    (0..hours)
        .map(|h| {
            Record::new(
                series_key,
                start + Duration::hours(h as i64),
                Decimal::new(h as i64 * 10, 1),
            )
        })
        .collect()
}

#[tokio::test]
async fn replaying_a_batch_changes_nothing() {
    let store = RecordStore::in_memory().await.unwrap();
    let batch = hourly_batch("600", 48);

    assert_eq!(store.upsert_batch(&batch).await.unwrap(), 48);

    let range = TimeRange::new(
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 6, 3, 0, 0, 0).unwrap(),
    )
    .unwrap();
    let first_state = store.read_range("600", &range).await.unwrap();

    assert_eq!(store.upsert_batch(&batch).await.unwrap(), 0);
    let second_state = store.read_range("600", &range).await.unwrap();

    assert_eq!(first_state, second_state);
    assert_eq!(store.count_records("600").await.unwrap(), 48);
}

#[tokio::test]
async fn overlapping_batches_count_only_new_keys() {
    let store = RecordStore::in_memory().await.unwrap();

    assert_eq!(store.upsert_batch(&hourly_batch("600", 24)).await.unwrap(), 24);
    // 24 overlapping keys, 12 new ones
    assert_eq!(store.upsert_batch(&hourly_batch("600", 36)).await.unwrap(), 12);
    assert_eq!(store.count_records("600").await.unwrap(), 36);
}

#[tokio::test]
async fn series_are_isolated_by_key() {
    let store = RecordStore::in_memory().await.unwrap();

    store.upsert_batch(&hourly_batch("600", 24)).await.unwrap();
    // same timestamps under another series key are distinct rows
    assert_eq!(store.upsert_batch(&hourly_batch("601", 24)).await.unwrap(), 24);
    assert_eq!(store.count_records("600").await.unwrap(), 24);
    assert_eq!(store.count_records("601").await.unwrap(), 24);
}

#[tokio::test]
async fn empty_batch_is_a_no_op() {
    let store = RecordStore::in_memory().await.unwrap();
    assert_eq!(store.upsert_batch(&[]).await.unwrap(), 0);
}
