//! Range chunking coverage properties.

use chrono::{Duration, TimeZone, Utc};

use energy_data_collector::chunk::{RangeError, TimeRange};

fn range(days: i64) -> TimeRange {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    TimeRange::new(start, start + Duration::days(days)).unwrap()
}

/// Chunks must tile the range exactly: contiguous, no gap, no overlap.
fn assert_exact_cover(range: &TimeRange, max_span: Duration) {
    let chunks: Vec<TimeRange> = range.chunks(max_span).unwrap().collect();
    assert!(!chunks.is_empty());
    assert_eq!(chunks.first().unwrap().start(), range.start());
    assert_eq!(chunks.last().unwrap().end(), range.end());
    for pair in chunks.windows(2) {
        assert_eq!(pair[0].end(), pair[1].start());
    }
    for chunk in &chunks {
        assert!(chunk.duration() <= max_span);
    }
}

#[test]
fn chunks_tile_ranges_exactly() {
    assert_exact_cover(&range(9), Duration::days(3));
    assert_exact_cover(&range(10), Duration::days(3));
    assert_exact_cover(&range(1), Duration::days(90));
    assert_exact_cover(&range(365), Duration::days(30));

    let odd = TimeRange::new(
        Utc.with_ymd_and_hms(2024, 1, 1, 7, 30, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 1, 14, 22, 15, 0).unwrap(),
    )
    .unwrap();
    assert_exact_cover(&odd, Duration::days(4));
}

#[test]
fn chunk_count_is_ceiling_of_duration_over_span() {
    let cases = [(9i64, 3i64, 3usize), (10, 3, 4), (3, 3, 1), (1, 90, 1)];
    for (days, span, expected) in cases {
        let count = range(days).chunks(Duration::days(span)).unwrap().count();
        assert_eq!(count, expected, "{days} days / {span}-day span");
    }
}

#[test]
fn inverted_and_empty_ranges_are_rejected() {
    let start = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    assert!(matches!(
        TimeRange::new(start, end),
        Err(RangeError::InvalidRange { .. })
    ));
    assert!(matches!(
        TimeRange::new(start, start),
        Err(RangeError::InvalidRange { .. })
    ));
}

#[test]
fn non_positive_span_is_rejected() {
    assert!(range(3).chunks(Duration::zero()).is_err());
    assert!(range(3).chunks(Duration::days(-1)).is_err());
}
