//! ZCL header decoding
//!
//! Decodes the leading bytes of a frame payload into frame-control fields,
//! the optional manufacturer code, the sequence number and the command id.
//!
//! Wire layout:
//! - byte 0: frame control (bits 0-1 frame type, bit 2 manufacturer-specific,
//!   bit 3 direction, bit 4 disable-default-response)
//! - bytes 1-2: little-endian manufacturer code, only when bit 2 is set
//! - next byte: ZCL sequence number
//! - next byte: command id
//!
//! Malformed input never produces an error: each field downstream of an
//! unavailable byte is left unset.

use crate::types::{ZclDirection, ZclFrameType, ZclHeader};

/// Frame-control bit masks
const FC_FRAME_TYPE_MASK: u8 = 0x03;
const FC_FRAME_TYPE_CLUSTER: u8 = 0x01;
const FC_MANUFACTURER_SPECIFIC: u8 = 0x04;
const FC_SERVER_TO_CLIENT: u8 = 0x08;
const FC_DISABLE_DEFAULT_RSP: u8 = 0x10;

/// Decode a ZCL header from the start of a frame payload
///
/// Payloads shorter than 3 bytes yield an all-unset header. A
/// manufacturer-specific frame needs the full 5-byte header before the
/// code is trusted; with fewer bytes only the frame-control flags are set.
pub fn decode_zcl_header(payload: &[u8]) -> ZclHeader {
    let mut header = ZclHeader::default();
    if payload.len() < 3 {
        return header;
    }

    let fc = payload[0];
    header.frame_control = Some(fc);
    header.frame_type = Some(if fc & FC_FRAME_TYPE_MASK == FC_FRAME_TYPE_CLUSTER {
        ZclFrameType::ClusterSpecific
    } else {
        ZclFrameType::Global
    });
    header.manufacturer_specific = fc & FC_MANUFACTURER_SPECIFIC != 0;
    header.direction = Some(if fc & FC_SERVER_TO_CLIENT != 0 {
        ZclDirection::ServerToClient
    } else {
        ZclDirection::ClientToServer
    });
    header.disable_default_response = fc & FC_DISABLE_DEFAULT_RSP != 0;

    let mut cursor = 1;
    if header.manufacturer_specific {
        // code plus sequence and command need four more bytes past frame control
        if payload.len() < 5 {
            return header;
        }
        header.manufacturer_code = Some(u16::from_le_bytes([payload[1], payload[2]]));
        cursor = 3;
    }

    header.sequence = Some(payload[cursor]);
    header.command_id = Some(payload[cursor + 1]);
    header
}

/// Header size in bytes, as implied by the decoded flags
///
/// This is the offset at which cluster command bodies (e.g. OTA requests)
/// start inside the payload.
pub fn zcl_header_len(header: &ZclHeader) -> usize {
    1 + if header.manufacturer_specific { 2 } else { 0 } + 2
}

/// Normalize a manufacturer code to the canonical 4-digit uppercase form
///
/// Accepts `119c`, `119C` and `0x119c` alike; the operation is idempotent.
pub fn normalize_manufacturer_code(code: &str) -> String {
    let trimmed = code.trim();
    let without_prefix = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    without_prefix.to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_payload_all_unset() {
        for payload in [&[][..], &[0x18][..], &[0x18, 0x2A][..]] {
            let header = decode_zcl_header(payload);
            assert_eq!(header.frame_control, None);
            assert_eq!(header.frame_type, None);
            assert_eq!(header.direction, None);
            assert!(!header.manufacturer_specific);
            assert!(!header.disable_default_response);
            assert_eq!(header.manufacturer_code, None);
            assert_eq!(header.sequence, None);
            assert_eq!(header.command_id, None);
        }
    }

    #[test]
    fn test_plain_global_header() {
        // Report Attributes, server to client, default response disabled
        let header = decode_zcl_header(&[0x18, 0x2A, 0x0A, 0x00, 0x00]);
        assert_eq!(header.frame_control, Some(0x18));
        assert_eq!(header.frame_type, Some(ZclFrameType::Global));
        assert_eq!(header.direction, Some(ZclDirection::ServerToClient));
        assert!(!header.manufacturer_specific);
        assert!(header.disable_default_response);
        assert_eq!(header.manufacturer_code, None);
        assert_eq!(header.sequence, Some(0x2A));
        assert_eq!(header.command_id, Some(0x0A));
    }

    #[test]
    fn test_cluster_specific_frame_type() {
        let header = decode_zcl_header(&[0x01, 0x10, 0x00]);
        assert_eq!(header.frame_type, Some(ZclFrameType::ClusterSpecific));
        assert_eq!(header.direction, Some(ZclDirection::ClientToServer));
        assert_eq!(header.sequence, Some(0x10));
        assert_eq!(header.command_id, Some(0x00));
    }

    #[test]
    fn test_manufacturer_specific_header() {
        // 0x1C = manufacturer-specific, server to client, default rsp disabled
        let header = decode_zcl_header(&[0x1C, 0x9C, 0x11, 0x33, 0x0A]);
        assert!(header.manufacturer_specific);
        assert_eq!(header.manufacturer_code, Some(0x119C));
        assert_eq!(header.manufacturer_code_hex(), Some("119C".to_string()));
        assert_eq!(header.sequence, Some(0x33));
        assert_eq!(header.command_id, Some(0x0A));
    }

    #[test]
    fn test_truncated_manufacturer_header_keeps_code_unset() {
        // Three bytes with the manufacturer bit set: flags only, no code
        let header = decode_zcl_header(&[0x04, 0x9C, 0x11]);
        assert!(header.manufacturer_specific);
        assert_eq!(header.frame_type, Some(ZclFrameType::Global));
        assert_eq!(header.direction, Some(ZclDirection::ClientToServer));
        assert_eq!(header.manufacturer_code, None);
        assert_eq!(header.sequence, None);
        assert_eq!(header.command_id, None);
    }

    #[test]
    fn test_header_len() {
        let plain = decode_zcl_header(&[0x00, 0x01, 0x02]);
        assert_eq!(zcl_header_len(&plain), 3);
        let manuf = decode_zcl_header(&[0x04, 0x9C, 0x11, 0x01, 0x02]);
        assert_eq!(zcl_header_len(&manuf), 5);
    }

    #[test]
    fn test_normalize_manufacturer_code() {
        assert_eq!(normalize_manufacturer_code("0x119c"), "119C");
        assert_eq!(normalize_manufacturer_code("119c"), "119C");
        assert_eq!(normalize_manufacturer_code("119C"), "119C");
        // Idempotent on already-normalized input
        assert_eq!(
            normalize_manufacturer_code(&normalize_manufacturer_code("0X119c")),
            "119C"
        );
    }
}
