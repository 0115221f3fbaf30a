//! OTA Upgrade cluster request decoding
//!
//! Decodes the three inbound (client-to-server) request bodies of the OTA
//! cluster: Query Next Image Request (0x01), Image Block Request (0x03) and
//! Upgrade End Request (0x06). These carry the device's firmware identity and
//! download progress, which is everything needed to follow an upgrade from
//! the inbound side alone.
//!
//! All multi-byte fields are little-endian per ZCL. Decoding is all-or-nothing
//! per command shape: a byte count short of the fixed prefix yields `None`,
//! never a partial struct.

use crate::types::{OtaRequest, ZclHeader};
use crate::zcl::zcl_header_len;
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read};

/// OTA command ids with a decodable inbound request body
pub const CMD_QUERY_NEXT_IMAGE: u8 = 0x01;
pub const CMD_IMAGE_BLOCK: u8 = 0x03;
pub const CMD_UPGRADE_END: u8 = 0x06;

/// Decode an OTA request body from a full frame payload
///
/// The body starts right after the ZCL header described by `header`. Any
/// command id other than the three inbound request shapes yields `None`.
pub fn decode_ota_request(payload: &[u8], header: &ZclHeader) -> Option<OtaRequest> {
    let command = header.command_id?;
    let body = payload.get(zcl_header_len(header)..)?;
    if body.is_empty() {
        return None;
    }
    match command {
        CMD_QUERY_NEXT_IMAGE => decode_query_next_image(body),
        CMD_IMAGE_BLOCK => decode_image_block(body),
        CMD_UPGRADE_END => decode_upgrade_end(body),
        _ => None,
    }
}

/// Query Next Image Request: field control, manufacturer id, image type,
/// file version, optional hardware version (field-control bit 0)
fn decode_query_next_image(body: &[u8]) -> Option<OtaRequest> {
    if body.len() < 9 {
        return None;
    }
    let mut cursor = Cursor::new(body);
    let field_control = cursor.read_u8().ok()?;
    let manufacturer_id = cursor.read_u16::<LittleEndian>().ok()?;
    let image_type = cursor.read_u16::<LittleEndian>().ok()?;
    let file_version = cursor.read_u32::<LittleEndian>().ok()?;
    let hardware_version = if field_control & 0x01 != 0 && body.len() >= 11 {
        Some(cursor.read_u16::<LittleEndian>().ok()?)
    } else {
        None
    };
    Some(OtaRequest::QueryNextImage {
        field_control,
        manufacturer_id,
        image_type,
        file_version,
        hardware_version,
    })
}

/// Image Block Request: fixed 14-byte prefix, then optional requesting node
/// address (field-control bit 0) and block request delay (bit 1)
fn decode_image_block(body: &[u8]) -> Option<OtaRequest> {
    if body.len() < 14 {
        return None;
    }
    let mut cursor = Cursor::new(body);
    let field_control = cursor.read_u8().ok()?;
    let manufacturer_id = cursor.read_u16::<LittleEndian>().ok()?;
    let image_type = cursor.read_u16::<LittleEndian>().ok()?;
    let file_version = cursor.read_u32::<LittleEndian>().ok()?;
    let file_offset = cursor.read_u32::<LittleEndian>().ok()?;
    let max_data_size = cursor.read_u8().ok()?;

    let mut remaining = body.len() - 14;
    let request_node_addr = if field_control & 0x01 != 0 && remaining >= 8 {
        let mut addr = [0u8; 8];
        cursor.read_exact(&mut addr).ok()?;
        remaining -= 8;
        Some(hex::encode_upper(addr))
    } else {
        None
    };
    let block_request_delay = if field_control & 0x02 != 0 && remaining >= 2 {
        Some(cursor.read_u16::<LittleEndian>().ok()?)
    } else {
        None
    };

    Some(OtaRequest::ImageBlock {
        field_control,
        manufacturer_id,
        image_type,
        file_version,
        file_offset,
        max_data_size,
        request_node_addr,
        block_request_delay,
    })
}

/// Upgrade End Request: status, manufacturer id, image type, file version
fn decode_upgrade_end(body: &[u8]) -> Option<OtaRequest> {
    if body.len() < 9 {
        return None;
    }
    let mut cursor = Cursor::new(body);
    let status = cursor.read_u8().ok()?;
    let manufacturer_id = cursor.read_u16::<LittleEndian>().ok()?;
    let image_type = cursor.read_u16::<LittleEndian>().ok()?;
    let file_version = cursor.read_u32::<LittleEndian>().ok()?;
    Some(OtaRequest::UpgradeEnd {
        status,
        manufacturer_id,
        image_type,
        file_version,
    })
}
