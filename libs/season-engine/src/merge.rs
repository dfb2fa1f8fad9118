use std::collections::HashSet;

use serde::Deserialize;

use fox_api::Record;

/// Which field identifies a record when deduplicating.
///
/// A bucket must stick to one mode for its whole life: artifacts written
/// under one mode are not migrated when read under the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeMode {
    #[default]
    #[serde(alias = "timestamp")]
    ByTimestamp,
    #[serde(alias = "seq_number", alias = "sequence_number")]
    BySequenceNumber,
}

impl MergeMode {
    pub fn identity(self, record: &Record) -> u64 {
        match self {
            MergeMode::ByTimestamp => record.timestamp,
            MergeMode::BySequenceNumber => record.seq_number,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeResult {
    /// Deduplicated, ascending by identity key.
    pub merged: Vec<Record>,
    /// Write-back is needed only when this is positive.
    pub new_count: i64,
}

/// Merge fresh records into a partition's history.
///
/// Both inputs are concatenated (incoming first) and stably sorted by the
/// identity key; the first record of every key is kept, so an incoming
/// record wins over a historic one with the same key.
///
/// `new_count` differs per mode:
/// - `ByTimestamp`: incoming records whose full tuple is absent from
///   `historic`. Key collisions inside `incoming` can make it exceed the
///   growth of the merged set.
/// - `BySequenceNumber`: `2 * unique_keys - total_inputs`, the number of
///   records that did not collide. Only exact while a key appears at most
///   twice (once per side); three or more records sharing a key push it
///   down, possibly below zero, which turns the write-back into a skip.
pub fn merge(incoming: &[Record], historic: &[Record], mode: MergeMode) -> MergeResult {
    let mut all: Vec<Record> = Vec::with_capacity(incoming.len() + historic.len());
    all.extend_from_slice(incoming);
    all.extend_from_slice(historic);
    let total = all.len() as i64;

    all.sort_by_key(|r| mode.identity(r));
    all.dedup_by_key(|r| mode.identity(r));

    let new_count = match mode {
        MergeMode::ByTimestamp => {
            let known: HashSet<&Record> = historic.iter().collect();
            incoming.iter().filter(|r| !known.contains(r)).count() as i64
        }
        MergeMode::BySequenceNumber => 2 * all.len() as i64 - total,
    };

    MergeResult { merged: all, new_count }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(ts: u64, seq: u64) -> Record {
        Record::new(ts, vec![0, 0, 0, seq as u8], seq, 1)
    }

    fn keys(records: &[Record], mode: MergeMode) -> Vec<u64> {
        records.iter().map(|r| mode.identity(r)).collect()
    }

    #[test]
    fn first_sync_keeps_everything() {
        let incoming = vec![rec(100, 1), rec(200, 2)];
        let out = merge(&incoming, &[], MergeMode::BySequenceNumber);
        assert_eq!(out.merged, incoming);
        assert_eq!(out.new_count, 2);
    }

    #[test]
    fn identical_history_needs_no_write_back() {
        for mode in [MergeMode::ByTimestamp, MergeMode::BySequenceNumber] {
            let out = merge(&[rec(100, 1)], &[rec(100, 1)], mode);
            assert_eq!(out.merged, vec![rec(100, 1)]);
            assert_eq!(out.new_count, 0, "{mode:?}");
        }
    }

    #[test]
    fn incoming_wins_on_key_collision() {
        let mut fresh = rec(100, 1);
        fresh.lqi = 4;
        let out = merge(&[fresh.clone()], &[rec(100, 1)], MergeMode::ByTimestamp);
        assert_eq!(out.merged, vec![fresh]);
        // Same key but a different tuple still counts as new in timestamp mode.
        assert_eq!(out.new_count, 1);
    }

    #[test]
    fn output_is_unique_and_sorted_by_identity() {
        let incoming = vec![rec(500, 5), rec(100, 1), rec(300, 3), rec(100, 1)];
        let historic = vec![rec(200, 2), rec(300, 3), rec(400, 4)];
        for (mode, expected) in [
            (MergeMode::ByTimestamp, [100u64, 200, 300, 400, 500]),
            (MergeMode::BySequenceNumber, [1u64, 2, 3, 4, 5]),
        ] {
            let out = merge(&incoming, &historic, mode);
            assert_eq!(keys(&out.merged, mode), expected, "{mode:?}");
        }
    }

    #[test]
    fn sequence_mode_sorts_by_seq_not_time() {
        let out = merge(&[rec(100, 9), rec(200, 3)], &[], MergeMode::BySequenceNumber);
        assert_eq!(keys(&out.merged, MergeMode::BySequenceNumber), [3, 9]);
    }

    #[test]
    fn merge_is_idempotent() {
        let incoming = vec![rec(300, 3), rec(100, 1), rec(100, 1)];
        let historic = vec![rec(200, 2), rec(300, 3)];
        for mode in [MergeMode::ByTimestamp, MergeMode::BySequenceNumber] {
            let once = merge(&incoming, &historic, mode).merged;
            assert_eq!(merge(&once, &[], mode).merged, once);
        }
    }

    #[test]
    fn timestamp_mode_counts_tuples_absent_from_history() {
        let incoming = vec![rec(100, 1), rec(200, 2), rec(200, 2)];
        let historic = vec![rec(100, 1)];
        let out = merge(&incoming, &historic, MergeMode::ByTimestamp);
        assert_eq!(out.merged.len(), 2);
        // The duplicated incoming row is counted twice.
        assert_eq!(out.new_count, 2);
    }

    #[test]
    fn sequence_mode_count_goes_negative_on_three_way_collision() {
        let incoming = vec![rec(100, 1), rec(101, 1)];
        let historic = vec![rec(100, 1)];
        let out = merge(&incoming, &historic, MergeMode::BySequenceNumber);
        assert_eq!(out.merged.len(), 1);
        assert_eq!(out.new_count, -1);
    }

    #[test]
    fn sequence_mode_counts_non_colliding_records() {
        let incoming = vec![rec(100, 1), rec(200, 2), rec(300, 3)];
        let historic = vec![rec(100, 1), rec(50, 0)];
        let out = merge(&incoming, &historic, MergeMode::BySequenceNumber);
        // keys 0..=3 → 4 unique of 5 inputs
        assert_eq!(out.new_count, 3);
    }
}
