//! Manufacturer resolution index
//!
//! Maps a device's short network address to a 4-hex-digit manufacturer code.
//! Built in a dedicated first pass over the log so that frames carrying no
//! manufacturer code can still be attributed during analysis. Two sources
//! feed the index: manufacturer-specific ZCL headers, and the manufacturer id
//! inside OTA Query Next Image requests (devices that never send
//! manufacturer-specific frames still identify themselves when polling for
//! firmware). Last observation wins on conflict.
//!
//! The index can be persisted as a flat JSON object keyed by the base-10
//! network address, so repeated runs over a large log skip the first pass.

use crate::normalize::LineNormalizer;
use crate::ota;
use crate::types::{DecoderError, OtaRequest, Result, ZclDirection};
use crate::zcl;
use log::debug;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct ManufacturerIndex {
    entries: HashMap<u16, String>,
}

impl ManufacturerIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a code for a network address, replacing any earlier observation
    pub fn record(&mut self, network_id: u16, code: &str) {
        self.entries
            .insert(network_id, zcl::normalize_manufacturer_code(code));
    }

    pub fn lookup(&self, network_id: u16) -> Option<&str> {
        self.entries.get(&network_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Scan the whole log once and index every resolvable address
    ///
    /// Runs independently of any analysis filter so that a filtered run can
    /// still resolve codes for the devices it keeps.
    pub fn from_log(path: &Path, normalizer: &LineNormalizer) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| DecoderError::LogReadError(format!("{}: {e}", path.display())))?;
        let reader = BufReader::new(file);

        let mut index = Self::new();
        for line in reader.lines() {
            let line = line?;
            let Some(record) = normalizer.normalize(&line) else {
                continue;
            };
            let Some(network_id) = record.network_id else {
                continue;
            };
            let header = zcl::decode_zcl_header(&record.payload);
            if let Some(code) = header.manufacturer_code_hex() {
                index.record(network_id, &code);
            }
            if record.is_ota_cluster() && header.direction == Some(ZclDirection::ClientToServer) {
                if let Some(OtaRequest::QueryNextImage {
                    manufacturer_id, ..
                }) = ota::decode_ota_request(&record.payload, &header)
                {
                    index.record(network_id, &format!("{manufacturer_id:04X}"));
                }
            }
        }
        debug!(
            "Indexed {} network addresses from {}",
            index.len(),
            path.display()
        );
        Ok(index)
    }

    /// Load a persisted index, a JSON object of base-10 address to hex code
    pub fn load_cache(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| DecoderError::CacheError(format!("{}: {e}", path.display())))?;
        let raw: HashMap<String, String> = serde_json::from_str(&text)
            .map_err(|e| DecoderError::CacheError(format!("{}: {e}", path.display())))?;

        let mut index = Self::new();
        for (key, code) in raw {
            let network_id = key.parse::<u16>().map_err(|_| {
                DecoderError::CacheError(format!(
                    "bad network address key '{key}' in {}",
                    path.display()
                ))
            })?;
            index.record(network_id, &code);
        }
        Ok(index)
    }

    pub fn save_cache(&self, path: &Path) -> Result<()> {
        let raw: HashMap<String, String> = self
            .entries
            .iter()
            .map(|(id, code)| (id.to_string(), code.clone()))
            .collect();
        let text = serde_json::to_string(&raw)
            .map_err(|e| DecoderError::CacheError(e.to_string()))?;
        std::fs::write(path, text)
            .map_err(|e| DecoderError::CacheError(format!("{}: {e}", path.display())))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn frame_line(name: &str, id: u16, cluster: &str, payload: &str) -> String {
        format!(
            "name {name} id {id} profileId 0104 clusterId {cluster} sourceEndpoint 01 \
             destinationEndpoint 01 groupId 0000 sequence 4F lastHopLqi 255 lastHopRssi -41 \
             time 2024-03-01 10:15:30.123 type physical deviceId 7 payload {payload}"
        )
    }

    #[test]
    fn test_from_log_records_both_sources() {
        let mut log = NamedTempFile::new().unwrap();
        // manufacturer-specific global frame, code 0x119C
        writeln!(log, "{}", frame_line("Thermostat", 25107, "0201", "1C 9C 11 33 0A")).unwrap();
        // OTA query next image from a device that never sends manufacturer-specific frames
        writeln!(
            log,
            "{}",
            frame_line("Bulb", 9001, "0019", "01 42 01 00 33 12 01 00 05 00 00 00")
        )
        .unwrap();
        log.flush().unwrap();

        let index = ManufacturerIndex::from_log(log.path(), &LineNormalizer::new()).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.lookup(25107), Some("119C"));
        assert_eq!(index.lookup(9001), Some("1233"));
        assert_eq!(index.lookup(1), None);
    }

    #[test]
    fn test_ota_identity_replaces_header_code() {
        let mut log = NamedTempFile::new().unwrap();
        // manufacturer-specific OTA query: header says 0x119C, request body says 0x1233
        writeln!(
            log,
            "{}",
            frame_line("Bulb", 9001, "0019", "05 9C 11 42 01 00 33 12 01 00 05 00 00 00")
        )
        .unwrap();
        log.flush().unwrap();

        let index = ManufacturerIndex::from_log(log.path(), &LineNormalizer::new()).unwrap();
        assert_eq!(index.lookup(9001), Some("1233"));
    }

    #[test]
    fn test_cache_round_trip() {
        let mut index = ManufacturerIndex::new();
        index.record(25107, "119C");
        index.record(9001, "0x1233");

        let cache = NamedTempFile::new().unwrap();
        index.save_cache(cache.path()).unwrap();

        let loaded = ManufacturerIndex::load_cache(cache.path()).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.lookup(25107), Some("119C"));
        assert_eq!(loaded.lookup(9001), Some("1233"));
    }

    #[test]
    fn test_corrupt_cache_is_an_error() {
        let mut cache = NamedTempFile::new().unwrap();
        write!(cache, "not json at all").unwrap();
        cache.flush().unwrap();
        assert!(matches!(
            ManufacturerIndex::load_cache(cache.path()),
            Err(DecoderError::CacheError(_))
        ));

        let mut cache = NamedTempFile::new().unwrap();
        write!(cache, "{{\"0x12AB\": \"119C\"}}").unwrap();
        cache.flush().unwrap();
        assert!(matches!(
            ManufacturerIndex::load_cache(cache.path()),
            Err(DecoderError::CacheError(_))
        ));
    }
}
