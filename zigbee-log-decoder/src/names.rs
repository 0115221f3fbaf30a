//! Display name tables for clusters, commands and manufacturers
//!
//! The catalog maps the protocol identifiers seen in frames to human-readable
//! labels for aggregation and rendering. Tables are owned by the catalog and
//! injected wherever names are needed, so callers can override entries (the
//! manufacturer table from a JSON file) without touching global state.

use crate::types::{DecoderError, Result};
use crate::zcl::normalize_manufacturer_code;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Friendly cluster names for common clusters
const CLUSTER_NAMES: &[(&str, &str)] = &[
    ("0000", "Basic"),
    ("0001", "Power Configuration"),
    ("0006", "On/Off"),
    ("0019", "OTA Upgrade"),
    ("0201", "Thermostat"),
    ("0400", "Illuminance Measurement"),
    ("0402", "Temperature Measurement"),
    ("0403", "Pressure Measurement"),
    ("0405", "Relative Humidity"),
    ("0406", "Occupancy Sensing"),
    ("0500", "IAS Zone"),
    ("0702", "Simple Metering"),
    ("0B04", "Electrical Measurement"),
    ("FF01", "Manufacturer-specific"),
    ("FFF1", "Manufacturer-specific"),
];

/// ZDO cluster labels (request/response pairs)
const ZDO_NAMES: &[(&str, &str)] = &[
    ("0000", "NWK Address Req"),
    ("8000", "NWK Address Rsp"),
    ("0001", "IEEE Address Req"),
    ("8001", "IEEE Address Rsp"),
    ("0002", "Node Descriptor Req"),
    ("8002", "Node Descriptor Rsp"),
    ("0003", "Power Descriptor Req"),
    ("8003", "Power Descriptor Rsp"),
    ("0004", "Simple Descriptor Req"),
    ("8004", "Simple Descriptor Rsp"),
    ("0005", "Active Endpoints Req"),
    ("8005", "Active Endpoints Rsp"),
    ("0006", "Match Descriptors Req"),
    ("8006", "Match Descriptors Rsp"),
    ("0031", "Mgmt LQI Req"),
    ("8031", "Mgmt LQI Rsp"),
    ("0032", "Mgmt Routing Req"),
    ("8032", "Mgmt Routing Rsp"),
];

/// ZCL profile-wide (global) command names
const GLOBAL_COMMAND_NAMES: &[(u8, &str)] = &[
    (0x00, "Read Attributes"),
    (0x01, "Read Attributes Response"),
    (0x02, "Write Attributes"),
    (0x04, "Write Attributes Response"),
    (0x06, "Configure Reporting"),
    (0x07, "Configure Reporting Response"),
    (0x08, "Read Reporting Configuration"),
    (0x09, "Read Reporting Configuration Response"),
    (0x0A, "Report Attributes"),
    (0x0B, "Default Response"),
    (0x0C, "Discover Attributes"),
    (0x0D, "Discover Attributes Response"),
    (0x11, "Discover Commands Received"),
    (0x12, "Discover Commands Received Response"),
    (0x13, "Discover Commands Generated"),
    (0x14, "Discover Commands Generated Response"),
    (0x15, "Discover Attributes Extended"),
    (0x16, "Discover Attributes Extended Response"),
];

/// OTA Upgrade cluster command names
const OTA_COMMAND_NAMES: &[(u8, &str)] = &[
    (0x00, "Image Notify"),
    (0x01, "Query Next Image Request"),
    (0x02, "Query Next Image Response"),
    (0x03, "Image Block Request"),
    (0x04, "Image Page Request"),
    (0x05, "Image Block Response"),
    (0x06, "Upgrade End Request"),
    (0x07, "Upgrade End Response"),
    (0x08, "Query Specific File"),
];

/// Minimal built-in manufacturer table; load a full one via a JSON DB file
const KNOWN_MANUFACTURERS: &[(&str, &str)] = &[
    ("119C", "Sinopé Technologies"),
    ("10D0", "Qorvo"),
    ("10F6", "Invensys Controls"),
    ("104E", "Centralite"),
    ("1049", "Silicon Labs"),
];

/// Lookup catalog for all display names used during aggregation and rendering
#[derive(Debug, Clone)]
pub struct NameCatalog {
    clusters: HashMap<&'static str, &'static str>,
    zdo_ops: HashMap<&'static str, &'static str>,
    global_commands: HashMap<u8, &'static str>,
    ota_commands: HashMap<u8, &'static str>,
    manufacturers: HashMap<String, String>,
}

impl Default for NameCatalog {
    fn default() -> Self {
        Self {
            clusters: CLUSTER_NAMES.iter().copied().collect(),
            zdo_ops: ZDO_NAMES.iter().copied().collect(),
            global_commands: GLOBAL_COMMAND_NAMES.iter().copied().collect(),
            ota_commands: OTA_COMMAND_NAMES.iter().copied().collect(),
            manufacturers: KNOWN_MANUFACTURERS
                .iter()
                .map(|(code, name)| (code.to_string(), name.to_string()))
                .collect(),
        }
    }
}

impl NameCatalog {
    /// Catalog with the built-in tables
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the manufacturer table with a JSON mapping of code to name
    ///
    /// The file is a flat object, e.g. `{"119C": "Sinopé Technologies"}`.
    /// Keys are normalized to uppercase 4-digit hex. On error the built-in
    /// table stays in place.
    pub fn load_manufacturer_db(&mut self, path: &Path) -> Result<()> {
        let text = fs::read_to_string(path)
            .map_err(|e| DecoderError::ManufacturerDbError(format!("{}: {}", path.display(), e)))?;
        let raw: HashMap<String, String> = serde_json::from_str(&text)
            .map_err(|e| DecoderError::ManufacturerDbError(format!("{}: {}", path.display(), e)))?;
        self.manufacturers = raw
            .into_iter()
            .map(|(code, name)| (normalize_manufacturer_code(&code), name))
            .collect();
        log::debug!(
            "Loaded {} manufacturer names from {:?}",
            self.manufacturers.len(),
            path
        );
        Ok(())
    }

    /// Friendly cluster name, or the raw id when unknown
    pub fn cluster<'a>(&'a self, cluster_id: &'a str) -> &'a str {
        self.clusters.get(cluster_id).copied().unwrap_or(cluster_id)
    }

    /// ZDO operation label for a ZDO cluster id
    pub fn zdo_op(&self, cluster_id: &str) -> String {
        match self.zdo_ops.get(cluster_id) {
            Some(name) => (*name).to_string(),
            None => format!("ZDO {}", cluster_id),
        }
    }

    /// ZCL global command label
    pub fn global_command(&self, command_id: u8) -> String {
        match self.global_commands.get(&command_id) {
            Some(name) => (*name).to_string(),
            None => format!("Global 0x{:02X}", command_id),
        }
    }

    /// OTA command label
    pub fn ota_command(&self, command_id: u8) -> String {
        match self.ota_commands.get(&command_id) {
            Some(name) => (*name).to_string(),
            None => format!("OTA 0x{:02X}", command_id),
        }
    }

    /// Manufacturer display name for a normalized code, empty when unknown
    pub fn manufacturer(&self, code: &str) -> &str {
        self.manufacturers.get(code).map(String::as_str).unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_builtin_lookups() {
        let names = NameCatalog::new();
        assert_eq!(names.cluster("0402"), "Temperature Measurement");
        assert_eq!(names.cluster("BEEF"), "BEEF");
        assert_eq!(names.zdo_op("8005"), "Active Endpoints Rsp");
        assert_eq!(names.zdo_op("0036"), "ZDO 0036");
        assert_eq!(names.global_command(0x0A), "Report Attributes");
        assert_eq!(names.global_command(0x3F), "Global 0x3F");
        assert_eq!(names.ota_command(0x03), "Image Block Request");
        assert_eq!(names.ota_command(0x55), "OTA 0x55");
        assert_eq!(names.manufacturer("119C"), "Sinopé Technologies");
        assert_eq!(names.manufacturer("FFFF"), "");
    }

    #[test]
    fn test_manufacturer_db_override() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"0x100b": "Philips", "115F": "Aqara"}}"#).unwrap();

        let mut names = NameCatalog::new();
        names.load_manufacturer_db(file.path()).unwrap();
        assert_eq!(names.manufacturer("100B"), "Philips");
        assert_eq!(names.manufacturer("115F"), "Aqara");
        // The override replaces the built-in table entirely
        assert_eq!(names.manufacturer("119C"), "");
    }

    #[test]
    fn test_manufacturer_db_errors() {
        let mut names = NameCatalog::new();
        assert!(names
            .load_manufacturer_db(Path::new("no-such-manufacturers.json"))
            .is_err());

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not json").unwrap();
        assert!(names.load_manufacturer_db(file.path()).is_err());
        // Built-in table intact after a failed load
        assert_eq!(names.manufacturer("119C"), "Sinopé Technologies");
    }
}
