//! Core types for the Zigbee log decoder library
//!
//! This module defines the fundamental types the decoder produces while processing
//! log files: the normalized frame record, the decoded ZCL header, and the decoded
//! OTA request bodies. Decode-level trouble is never an error here - missing or
//! undecodable bytes leave fields unset and the caller decides what to do.

use std::fmt;

/// Result type for decoder operations
pub type Result<T> = std::result::Result<T, DecoderError>;

/// One normalized log line from a Hubitat Zigbee radio log
///
/// This represents a single radio frame as reported by the hub, after parsing
/// either the key/value text shape or the JSON shape. Interpretation of the
/// payload (ZCL header, OTA bodies) is layered on top, not baked into parsing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FrameRecord {
    /// Device display name as configured on the hub
    pub name: String,
    /// Short 16-bit network address (DNI)
    pub network_id: Option<u16>,
    /// Hub-assigned numeric device id
    pub device_id: Option<u64>,
    /// Zigbee profile id, uppercase 4-digit hex (`0000` = ZDO)
    pub profile_id: String,
    /// Cluster id, uppercase 4-digit hex (`0019` = OTA Upgrade)
    pub cluster_id: String,
    /// Source endpoint, hex string
    pub source_endpoint: String,
    /// Destination endpoint, hex string
    pub destination_endpoint: String,
    /// Group id, hex string
    pub group_id: String,
    /// Frame sequence number as reported by the hub
    pub sequence: Option<u64>,
    /// Link quality indicator of the last hop
    pub lqi: Option<u16>,
    /// Received signal strength of the last hop, dBm
    pub rssi: Option<i16>,
    /// Timestamp string, `YYYY-MM-DD HH:MM:SS.mmm`
    pub time: Option<String>,
    /// Traffic type tag from the log line (e.g. `physical`)
    pub traffic_type: Option<String>,
    /// Raw payload bytes in wire order
    pub payload: Vec<u8>,
}

impl FrameRecord {
    /// True if this frame belongs to the ZDO profile (network management)
    pub fn is_zdo(&self) -> bool {
        self.profile_id == "0000"
    }

    /// True if this frame belongs to the OTA Upgrade cluster
    pub fn is_ota_cluster(&self) -> bool {
        self.cluster_id == "0019"
    }
}

/// ZCL frame type from frame-control bits 0-1
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZclFrameType {
    /// Profile-wide command (read/write/report attributes, ...)
    Global,
    /// Command specific to the frame's cluster
    ClusterSpecific,
}

impl fmt::Display for ZclFrameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZclFrameType::Global => write!(f, "global"),
            ZclFrameType::ClusterSpecific => write!(f, "cluster"),
        }
    }
}

/// ZCL frame direction from frame-control bit 3
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZclDirection {
    /// Hub-originated request
    ClientToServer,
    /// Device-originated report or response (unsolicited traffic)
    ServerToClient,
}

impl fmt::Display for ZclDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZclDirection::ClientToServer => write!(f, "client_to_server"),
            ZclDirection::ServerToClient => write!(f, "server_to_client"),
        }
    }
}

/// Decoded ZCL header from the first payload bytes
///
/// Layout on the wire: frame control, optional little-endian manufacturer
/// code, sequence number, command id. Every field downstream of an
/// unavailable byte stays unset.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ZclHeader {
    /// Raw frame-control byte
    pub frame_control: Option<u8>,
    /// Frame type from bits 0-1
    pub frame_type: Option<ZclFrameType>,
    /// Manufacturer-specific flag (bit 2)
    pub manufacturer_specific: bool,
    /// Direction (bit 3)
    pub direction: Option<ZclDirection>,
    /// Disable-default-response flag (bit 4)
    pub disable_default_response: bool,
    /// 16-bit manufacturer code, present only on manufacturer-specific frames
    pub manufacturer_code: Option<u16>,
    /// ZCL sequence number
    pub sequence: Option<u8>,
    /// Command id, interpreted per frame type
    pub command_id: Option<u8>,
}

impl ZclHeader {
    /// Manufacturer code formatted as a 4-digit uppercase hex string
    pub fn manufacturer_code_hex(&self) -> Option<String> {
        self.manufacturer_code.map(|code| format!("{:04X}", code))
    }

    /// True if bit 3 marks this frame as device-originated
    pub fn is_server_to_client(&self) -> bool {
        self.direction == Some(ZclDirection::ServerToClient)
    }
}

/// Decoded OTA Upgrade cluster request body (client-to-server commands only)
///
/// Decoding is all-or-nothing per shape: if the bytes available do not cover
/// the fixed-length prefix of the command, no variant is produced at all.
#[derive(Debug, Clone, PartialEq)]
pub enum OtaRequest {
    /// Command 0x01 - device asks whether a newer image exists
    QueryNextImage {
        field_control: u8,
        manufacturer_id: u16,
        image_type: u16,
        file_version: u32,
        /// Present when field-control bit 0 is set and the bytes remain
        hardware_version: Option<u16>,
    },
    /// Command 0x03 - device requests the next block of the image
    ImageBlock {
        field_control: u8,
        manufacturer_id: u16,
        image_type: u16,
        file_version: u32,
        file_offset: u32,
        max_data_size: u8,
        /// 8-byte requesting node address, hex string, gated by field-control bit 0
        request_node_addr: Option<String>,
        /// Minimum block request delay in ms, gated by field-control bit 1
        block_request_delay: Option<u16>,
    },
    /// Command 0x06 - device reports the download finished
    UpgradeEnd {
        status: u8,
        manufacturer_id: u16,
        image_type: u16,
        file_version: u32,
    },
}

impl OtaRequest {
    /// OTA command id carried by this request shape
    pub fn command_id(&self) -> u8 {
        match self {
            OtaRequest::QueryNextImage { .. } => 0x01,
            OtaRequest::ImageBlock { .. } => 0x03,
            OtaRequest::UpgradeEnd { .. } => 0x06,
        }
    }
}

/// Errors that can occur during analysis
#[derive(Debug, thiserror::Error)]
pub enum DecoderError {
    #[error("Failed to read log file: {0}")]
    LogReadError(String),

    #[error("Failed to read index cache: {0}")]
    CacheError(String),

    #[error("Failed to load manufacturer DB: {0}")]
    ManufacturerDbError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
