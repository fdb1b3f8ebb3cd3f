//! Merging per-chunk record batches into one ordered series.

use std::collections::HashSet;

use crate::Record;

/// Merge per-chunk batches into a single chronologically sorted series.
///
/// Duplicate natural keys (same series key and timestamp) can appear when a
/// provider echoes boundary rows in adjacent chunks; the record from the
/// earliest batch wins. The sort is stable, so equal timestamps keep their
/// input order and the dedup pass always sees the earlier batch's record
/// first.
pub fn merge_chunks(batches: Vec<Vec<Record>>) -> Vec<Record> {
    let total: usize = batches.iter().map(Vec::len).sum();
    let mut merged = Vec::with_capacity(total);
    for batch in batches {
        merged.extend(batch);
    }

    merged.sort_by(|a, b| {
        a.timestamp
            .cmp(&b.timestamp)
            .then_with(|| a.series_key.cmp(&b.series_key))
    });

    let mut seen = HashSet::with_capacity(merged.len());
    merged.retain(|record| seen.insert((record.series_key.clone(), record.timestamp)));
    merged
}
