// ════════════════════════════════════════════════════════════════
//  Record
// ════════════════════════════════════════════════════════════════

/// One telemetry sample as received from the device.
///
/// The same type flows through both paths: freshly fetched messages and
/// records decoded from a persisted partition artifact. Equality and hashing
/// cover the full tuple, which is what timestamp-mode merges use to count
/// genuinely new rows.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Record {
    /// Unix epoch, seconds (the API reports milliseconds; truncated on ingestion).
    pub timestamp: u64,
    /// Fixed-width opaque payload. Width is a deployment constant.
    pub payload: Vec<u8>,
    /// Device-assigned monotonic counter.
    pub seq_number: u64,
    /// Link quality indicator, carried through unchanged.
    pub lqi: i16,
}

impl Record {
    pub fn new(timestamp: u64, payload: Vec<u8>, seq_number: u64, lqi: i16) -> Self {
        Self { timestamp, payload, seq_number, lqi }
    }
}

/// Convert a millisecond epoch into whole seconds (truncating).
pub fn secs_from_ms(ms: u64) -> u64 {
    ms / 1000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secs_from_ms_truncates() {
        assert_eq!(secs_from_ms(1_700_000_000_999), 1_700_000_000);
        assert_eq!(secs_from_ms(999), 0);
    }

    #[test]
    fn equality_covers_full_tuple() {
        let a = Record::new(100, vec![0, 0, 0, 1], 1, -3);
        let mut b = a.clone();
        assert_eq!(a, b);
        b.lqi = 2;
        assert_ne!(a, b);
    }
}
