//! Log line normalization
//!
//! Hubitat emits Zigbee radio frames in two line shapes: a key/value text
//! line and a JSON object (the websocket stream form). Both carry the same
//! fields. The normalizer tries the text grammar first, then JSON; a line
//! matching neither is not a frame and is skipped by callers.
//!
//! Hex fields are normalized to uppercase and the payload is parsed into raw
//! bytes up front, so the decoders never touch string tokens. A payload token
//! that is not a valid hex byte truncates the byte sequence from that point.

use crate::types::FrameRecord;
use regex::Regex;
use serde_json::Value;

/// Key/value text line grammar, one frame per line
const TEXT_LINE_PATTERN: &str = concat!(
    r"^name\s+(?P<name>.*?)\s+id\s+(?P<id>\d+)\s+",
    r"profileId\s+(?P<profile>[0-9A-Fa-f]{4})\s+clusterId\s+(?P<cluster>[0-9A-Fa-f]{4})\s+",
    r"sourceEndpoint\s+(?P<se>[0-9A-Fa-f]{2})\s+destinationEndpoint\s+(?P<de>[0-9A-Fa-f]{2})\s+",
    r"groupId\s+(?P<group>[0-9A-Fa-f]{4})\s+sequence\s+(?P<seq>[0-9A-Fa-f]+)\s+",
    r"lastHopLqi\s+(?P<lqi>\d+)\s+lastHopRssi\s+(?P<rssi>-?\d+)\s+",
    r"time\s+(?P<time>\d{4}-\d{2}-\d{2}\s+\d{2}:\d{2}:\d{2}\.\d{3})\s+type\s+(?P<type>\w+)\s+",
    r"deviceId\s+(?P<device>\d+)\s+payload\s+(?P<payload>[0-9A-Fa-f]{2}(?:\s+[0-9A-Fa-f]{2})*)$",
);

/// Parses raw log lines into [`FrameRecord`]s
pub struct LineNormalizer {
    text_line: Regex,
}

impl Default for LineNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl LineNormalizer {
    pub fn new() -> Self {
        Self {
            text_line: Regex::new(TEXT_LINE_PATTERN).expect("Invalid text line regex"),
        }
    }

    /// Normalize one raw line, trying the text grammar first, then JSON
    ///
    /// Returns `None` for lines that are not frames (other log chatter,
    /// blank lines, truncated records).
    pub fn normalize(&self, line: &str) -> Option<FrameRecord> {
        self.parse_text_line(line)
            .or_else(|| Self::parse_json_line(line))
    }

    fn parse_text_line(&self, line: &str) -> Option<FrameRecord> {
        let caps = self.text_line.captures(line.trim())?;
        Some(FrameRecord {
            name: caps["name"].to_string(),
            network_id: caps["id"].parse().ok(),
            device_id: caps["device"].parse().ok(),
            profile_id: caps["profile"].to_uppercase(),
            cluster_id: caps["cluster"].to_uppercase(),
            source_endpoint: caps["se"].to_uppercase(),
            destination_endpoint: caps["de"].to_uppercase(),
            group_id: caps["group"].to_uppercase(),
            sequence: parse_sequence(&caps["seq"]),
            lqi: caps["lqi"].parse().ok(),
            rssi: caps["rssi"].parse().ok(),
            time: Some(caps["time"].to_string()),
            traffic_type: Some(caps["type"].to_string()),
            payload: parse_payload_tokens(caps["payload"].split_whitespace()),
        })
    }

    fn parse_json_line(line: &str) -> Option<FrameRecord> {
        let value: Value = serde_json::from_str(line).ok()?;
        let obj = value.as_object()?;

        let payload = match obj.get("payload") {
            Some(Value::Array(items)) => parse_payload_tokens(
                items
                    .iter()
                    .map(|item| item.as_str().unwrap_or("")),
            ),
            Some(Value::String(s)) => parse_payload_tokens(s.split_whitespace()),
            _ => Vec::new(),
        };

        Some(FrameRecord {
            name: obj
                .get("name")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .unwrap_or("unknown")
                .to_string(),
            network_id: obj
                .get("id")
                .and_then(value_as_u64)
                .and_then(|id| u16::try_from(id).ok()),
            device_id: obj.get("deviceId").and_then(value_as_u64),
            profile_id: hex_field(obj, "profileId"),
            cluster_id: hex_field(obj, "clusterId"),
            source_endpoint: hex_field(obj, "sourceEndpoint"),
            destination_endpoint: hex_field(obj, "destinationEndpoint"),
            group_id: hex_field(obj, "groupId"),
            sequence: obj.get("sequence").and_then(|v| match v {
                Value::Number(n) => n.as_u64(),
                Value::String(s) => parse_sequence(s),
                _ => None,
            }),
            lqi: obj
                .get("lastHopLqi")
                .and_then(Value::as_u64)
                .and_then(|v| u16::try_from(v).ok()),
            rssi: obj
                .get("lastHopRssi")
                .and_then(Value::as_i64)
                .and_then(|v| i16::try_from(v).ok()),
            time: obj.get("time").and_then(Value::as_str).map(str::to_string),
            traffic_type: obj.get("type").and_then(Value::as_str).map(str::to_string),
            payload,
        })
    }
}

/// Numeric JSON fields sometimes arrive as quoted strings
fn value_as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Hub sequence numbers are hex; fall back to decimal for odd emitters
fn parse_sequence(raw: &str) -> Option<u64> {
    u64::from_str_radix(raw, 16)
        .ok()
        .or_else(|| raw.parse().ok())
}

fn hex_field(obj: &serde_json::Map<String, Value>, key: &str) -> String {
    obj.get(key)
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_uppercase()
}

/// Parse payload tokens into bytes, truncating at the first bad token
fn parse_payload_tokens<'a, I>(tokens: I) -> Vec<u8>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut bytes = Vec::new();
    for token in tokens {
        match u8::from_str_radix(token, 16) {
            Ok(byte) => bytes.push(byte),
            Err(_) => break,
        }
    }
    bytes
}
