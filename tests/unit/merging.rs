//! Merge determinism across batch orderings.

use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;

use energy_data_collector::collector::merge_chunks;
use energy_data_collector::Record;

fn record(day: u32, hour: u32, value: i64) -> Record {
    Record::new(
        "unit",
        Utc.with_ymd_and_hms(2024, 1, day, hour, 0, 0).unwrap(),
        Decimal::new(value, 0),
    )
}

#[test]
fn any_batch_ordering_yields_the_same_timestamps() {
    let a = vec![record(1, 0, 1), record(1, 1, 2)];
    let b = vec![record(2, 0, 3), record(2, 1, 4)];
    let c = vec![record(3, 0, 5)];

    let forward = merge_chunks(vec![a.clone(), b.clone(), c.clone()]);
    let backward = merge_chunks(vec![c, b, a]);

    let forward_ts: Vec<_> = forward.iter().map(|r| r.timestamp).collect();
    let backward_ts: Vec<_> = backward.iter().map(|r| r.timestamp).collect();
    assert_eq!(forward_ts, backward_ts);
    assert!(forward_ts.windows(2).all(|p| p[0] < p[1]));
}

#[test]
fn duplicate_timestamps_resolve_to_the_earliest_batch() {
    let merged = merge_chunks(vec![
        vec![record(1, 23, 100)],
        // provider echoed the boundary row in the next chunk
        vec![record(1, 23, 999), record(2, 0, 200)],
    ]);
    assert_eq!(merged.len(), 2);
    assert_eq!(merged[0].value, Decimal::new(100, 0));

    // swapping the batches swaps the winner
    let merged = merge_chunks(vec![
        vec![record(1, 23, 999), record(2, 0, 200)],
        vec![record(1, 23, 100)],
    ]);
    assert_eq!(merged[0].value, Decimal::new(999, 0));
}

#[test]
fn records_of_different_series_never_collapse() {
    let mut other = record(1, 0, 7);
    other.series_key = "other".to_string();

    let merged = merge_chunks(vec![vec![record(1, 0, 1)], vec![other]]);
    assert_eq!(merged.len(), 2);
}
