use bytes::{Buf, BufMut};

use fox_api::Record;

/// Dataset name used by the deployed archive.
pub const DEFAULT_DATASET: &str = "lanloup_temps";
/// Payload width of the deployed devices.
pub const DEFAULT_PAYLOAD_WIDTH: usize = 4;

const TIMESTAMP_BYTES: usize = 8;
const SEQ_NUMBER_BYTES: usize = 8;
const LQI_BYTES: usize = 2;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("artifact truncated: need {needed} more bytes")]
    Truncated { needed: usize },

    #[error("payload width mismatch: configured {expected}, artifact has {found}")]
    FormatMismatch { expected: usize, found: usize },

    #[error("dataset mismatch: expected '{expected}', found '{found}'")]
    DatasetMismatch { expected: String, found: String },

    #[error("dataset name is not valid UTF-8")]
    InvalidDatasetName,

    #[error("{0} trailing bytes after the last record")]
    TrailingBytes(usize),

    #[error("record seq {seq_number} has a {found}-byte payload, expected {expected}")]
    PayloadWidth { seq_number: u64, expected: usize, found: usize },

    #[error("dataset name too long ({0} bytes)")]
    DatasetNameTooLong(usize),
}

/// Fixed-width binary codec for persisted partitions.
///
/// Layout (little-endian), one named dataset, no version header:
///
/// ```text
/// u16 name_len | name | u16 payload_width | u64 count
/// count × { u64 timestamp | payload | u64 seq_number | i16 lqi }
/// ```
#[derive(Debug, Clone)]
pub struct RecordCodec {
    dataset: String,
    payload_width: usize,
}

impl Default for RecordCodec {
    fn default() -> Self {
        Self::new(DEFAULT_DATASET, DEFAULT_PAYLOAD_WIDTH)
    }
}

impl RecordCodec {
    pub fn new(dataset: impl Into<String>, payload_width: usize) -> Self {
        Self { dataset: dataset.into(), payload_width }
    }

    fn record_len(&self) -> usize {
        TIMESTAMP_BYTES + self.payload_width + SEQ_NUMBER_BYTES + LQI_BYTES
    }

    pub fn encode(&self, records: &[Record]) -> Result<Vec<u8>, CodecError> {
        let name = self.dataset.as_bytes();
        let name_len =
            u16::try_from(name.len()).map_err(|_| CodecError::DatasetNameTooLong(name.len()))?;
        // Configured widths are validated at load (4 or 8), so this never saturates in practice.
        let width = u16::try_from(self.payload_width).unwrap_or(u16::MAX);

        let mut buf = Vec::with_capacity(2 + name.len() + 2 + 8 + records.len() * self.record_len());
        buf.put_u16_le(name_len);
        buf.put_slice(name);
        buf.put_u16_le(width);
        buf.put_u64_le(records.len() as u64);

        for r in records {
            if r.payload.len() != self.payload_width {
                return Err(CodecError::PayloadWidth {
                    seq_number: r.seq_number,
                    expected: self.payload_width,
                    found: r.payload.len(),
                });
            }
            buf.put_u64_le(r.timestamp);
            buf.put_slice(&r.payload);
            buf.put_u64_le(r.seq_number);
            buf.put_i16_le(r.lqi);
        }
        Ok(buf)
    }

    pub fn decode(&self, mut bytes: &[u8]) -> Result<Vec<Record>, CodecError> {
        need(&bytes, 2)?;
        let name_len = bytes.get_u16_le() as usize;
        need(&bytes, name_len)?;
        let found = std::str::from_utf8(&bytes[..name_len]).map_err(|_| CodecError::InvalidDatasetName)?;
        if found != self.dataset {
            return Err(CodecError::DatasetMismatch {
                expected: self.dataset.clone(),
                found: found.to_string(),
            });
        }
        bytes.advance(name_len);

        need(&bytes, 2 + 8)?;
        let width = bytes.get_u16_le() as usize;
        if width != self.payload_width {
            return Err(CodecError::FormatMismatch { expected: self.payload_width, found: width });
        }
        let count = bytes.get_u64_le();

        let body = (count as usize).saturating_mul(self.record_len());
        need(&bytes, body)?;
        if bytes.len() > body {
            return Err(CodecError::TrailingBytes(bytes.len() - body));
        }

        let mut records = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let timestamp = bytes.get_u64_le();
            let payload = bytes[..width].to_vec();
            bytes.advance(width);
            let seq_number = bytes.get_u64_le();
            let lqi = bytes.get_i16_le();
            records.push(Record { timestamp, payload, seq_number, lqi });
        }
        Ok(records)
    }
}

fn need(buf: &[u8], n: usize) -> Result<(), CodecError> {
    if buf.len() < n {
        Err(CodecError::Truncated { needed: n - buf.len() })
    } else {
        Ok(())
    }
}
