//! Shard split arithmetic.
//!
//! A file of size S split across N slaves yields N contiguous ranges:
//! shards 1..N-1 get `floor(S/N)` bytes each, shard N absorbs the
//! remainder. The ranges are 0-based byte offsets; shard indices on the
//! wire are 1-based.

use std::ops::Range;

/// Computes the byte range of each shard, in shard-index order.
///
/// Returns an empty vector when no slaves are configured. With fewer
/// bytes than slaves, leading shards are empty and the last shard holds
/// everything.
#[must_use]
pub fn shard_ranges(total: u64, slaves: usize) -> Vec<Range<u64>> {
    if slaves == 0 {
        return Vec::new();
    }
    let slaves_u64 = slaves as u64;
    let part = total / slaves_u64;

    let mut ranges = Vec::with_capacity(slaves);
    for i in 0..slaves_u64 {
        let start = i * part;
        let end = if i == slaves_u64 - 1 { total } else { start + part };
        ranges.push(start..end);
    }
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_sum_to_total() {
        for (total, slaves) in [(0, 3), (1, 3), (10, 2), (10, 3), (1000, 7), (5, 5)] {
            let ranges = shard_ranges(total, slaves);
            assert_eq!(ranges.len(), slaves);
            let sum: u64 = ranges.iter().map(|r| r.end - r.start).sum();
            assert_eq!(sum, total, "total {total} over {slaves} slaves");
        }
    }

    #[test]
    fn leading_shards_get_floor_last_gets_remainder() {
        let ranges = shard_ranges(10, 3);
        assert_eq!(ranges[0], 0..3);
        assert_eq!(ranges[1], 3..6);
        assert_eq!(ranges[2], 6..10);
    }

    #[test]
    fn ten_bytes_over_two_slaves_splits_evenly() {
        // "ABCDEFGHIJ" over 2 slaves: "ABCDE" + "FGHIJ".
        let ranges = shard_ranges(10, 2);
        assert_eq!(ranges, vec![0..5, 5..10]);
    }

    #[test]
    fn fewer_bytes_than_slaves() {
        let ranges = shard_ranges(2, 4);
        assert_eq!(ranges, vec![0..0, 0..0, 0..0, 0..2]);
    }

    #[test]
    fn no_slaves_yields_no_ranges() {
        assert!(shard_ranges(100, 0).is_empty());
    }

    #[test]
    fn ranges_are_contiguous() {
        let ranges = shard_ranges(12345, 6);
        for pair in ranges.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
        assert_eq!(ranges[0].start, 0);
        assert_eq!(ranges.last().unwrap().end, 12345);
    }
}
