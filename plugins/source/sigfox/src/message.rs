use serde::{Deserialize, Serialize};

use fox_api::{secs_from_ms, PluginError, Record};

// ════════════════════════════════════════════════════════════════
//  Wire format
// ════════════════════════════════════════════════════════════════

/// One page of `GET /devices/{id}/messages`.
#[derive(Debug, Deserialize)]
pub(crate) struct Page {
    pub data: Vec<RawMessage>,
    #[serde(default)]
    pub paging: Paging,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Paging {
    /// Absolute URL of the next page; absent on the last one.
    pub next: Option<String>,
}

/// The API reports `time` either as a number or as a decimal string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EpochMs {
    Number(u64),
    Text(String),
}

impl EpochMs {
    fn millis(&self) -> Result<u64, PluginError> {
        match self {
            EpochMs::Number(ms) => Ok(*ms),
            EpochMs::Text(s) => s
                .trim()
                .parse()
                .map_err(|e| PluginError::format_err(format!("time '{s}': {e}"))),
        }
    }
}

/// Device message exactly as the API returns it. Captures store these, so a
/// replay goes through the same conversion as a live fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMessage {
    pub time: EpochMs,
    pub data: String,
    #[serde(rename = "seqNumber")]
    pub seq_number: u64,
    pub lqi: i16,
}

impl RawMessage {
    pub fn to_record(&self, payload_width: usize) -> Result<Record, PluginError> {
        let payload = payload_from_hex(&self.data, payload_width)
            .map_err(|e| e.with_context(format!("message seq {}", self.seq_number)))?;
        Ok(Record {
            timestamp: secs_from_ms(self.time.millis()?),
            payload,
            seq_number: self.seq_number,
            lqi: self.lqi,
        })
    }
}

/// Read the hex payload as a big-endian number and lay it out on exactly
/// `width` bytes, zero-padded on the left.
fn payload_from_hex(data: &str, width: usize) -> Result<Vec<u8>, PluginError> {
    let data = data.trim();
    if data.is_empty() {
        return Err(PluginError::format_err("empty payload"));
    }
    let bytes = if data.len() % 2 == 1 {
        hex::decode(format!("0{data}"))
    } else {
        hex::decode(data)
    }
    .map_err(|e| PluginError::format_err(format!("payload '{data}': {e}")))?;

    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    let significant = &bytes[first..];
    if significant.len() > width {
        return Err(PluginError::format_err(format!(
            "payload '{data}' does not fit in {width} bytes"
        )));
    }

    let mut payload = vec![0u8; width - significant.len()];
    payload.extend_from_slice(significant);
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_page() {
        let page: Page = serde_json::from_str(
            r#"{
                "data": [
                    {"device": "ABC", "time": 1700000000123, "data": "0a1b2c3d", "seqNumber": 42, "lqi": 3},
                    {"device": "ABC", "time": "1700000600999", "data": "ff", "seqNumber": 43, "lqi": 1}
                ],
                "paging": {"next": "https://api.sigfox.com/v2/devices/ABC/messages?before=1"}
            }"#,
        )
        .unwrap();

        assert_eq!(page.data.len(), 2);
        assert!(page.paging.next.is_some());
        assert_eq!(
            page.data[0].to_record(4).unwrap(),
            Record::new(1_700_000_000, vec![0x0a, 0x1b, 0x2c, 0x3d], 42, 3)
        );
        assert_eq!(
            page.data[1].to_record(4).unwrap(),
            Record::new(1_700_000_600, vec![0, 0, 0, 0xff], 43, 1)
        );
    }

    #[test]
    fn last_page_has_no_next() {
        let page: Page = serde_json::from_str(r#"{"data": [], "paging": {}}"#).unwrap();
        assert!(page.paging.next.is_none());
        let page: Page = serde_json::from_str(r#"{"data": []}"#).unwrap();
        assert!(page.paging.next.is_none());
    }

    #[test]
    fn payload_padding() {
        assert_eq!(payload_from_hex("abc", 4).unwrap(), vec![0, 0, 0x0a, 0xbc]);
        assert_eq!(payload_from_hex("0000000102", 4).unwrap(), vec![0, 0, 1, 2]);
        assert_eq!(payload_from_hex("0102030405060708", 8).unwrap(), vec![1, 2, 3, 4, 5, 6, 7, 8]);
        assert!(payload_from_hex("0102030405", 4).is_err());
        assert!(payload_from_hex("zz", 4).is_err());
        assert!(payload_from_hex("", 4).is_err());
    }

    #[test]
    fn bad_time_is_a_format_error() {
        let msg = RawMessage {
            time: EpochMs::Text("yesterday".into()),
            data: "01".into(),
            seq_number: 1,
            lqi: 0,
        };
        assert_eq!(msg.to_record(4).unwrap_err().kind(), fox_api::ErrorKind::Format);
    }
}
