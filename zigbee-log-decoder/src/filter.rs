//! Frame filter chain
//!
//! Every configured predicate must accept a record for it to reach the
//! aggregation stage (logical AND). Unset predicates accept everything, so a
//! default filter passes the whole log through.

use crate::types::{FrameRecord, ZclHeader};
use crate::zcl;
use std::collections::HashSet;

/// Record predicates applied between normalization and aggregation
#[derive(Debug, Clone)]
pub struct FrameFilter {
    /// Keep only devices resolving to this manufacturer code
    pub manufacturer: Option<String>,
    /// Keep only this hub-assigned device id
    pub device_id: Option<u64>,
    /// Keep only devices whose display name contains this text
    pub device_name: Option<String>,
    /// Keep only this short network address
    pub network_id: Option<u16>,
    /// Keep only these cluster ids
    pub clusters: Option<HashSet<String>>,
    /// Whether ZDO (profile 0000) traffic is kept at all
    pub include_zdo: bool,
    /// Keep only server-to-client frames, OTA cluster traffic, and ZDO
    pub unsolicited_only: bool,
}

impl Default for FrameFilter {
    fn default() -> Self {
        Self {
            manufacturer: None,
            device_id: None,
            device_name: None,
            network_id: None,
            clusters: None,
            include_zdo: true,
            unsolicited_only: false,
        }
    }
}

impl FrameFilter {
    /// Create a filter that accepts every frame
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: match on a manufacturer code, any common spelling
    pub fn with_manufacturer(mut self, code: &str) -> Self {
        self.manufacturer = Some(zcl::normalize_manufacturer_code(code));
        self
    }

    /// Builder method: match on the hub-assigned device id
    pub fn with_device_id(mut self, device_id: u64) -> Self {
        self.device_id = Some(device_id);
        self
    }

    /// Builder method: case-insensitive substring match on the device name
    pub fn with_device_name(mut self, name: &str) -> Self {
        self.device_name = Some(name.to_lowercase());
        self
    }

    /// Builder method: match on the short network address
    pub fn with_network_id(mut self, network_id: u16) -> Self {
        self.network_id = Some(network_id);
        self
    }

    /// Builder method: keep only the given cluster ids
    pub fn with_clusters<I, S>(mut self, clusters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let set: HashSet<String> = clusters
            .into_iter()
            .map(|c| c.as_ref().to_uppercase())
            .collect();
        self.clusters = if set.is_empty() { None } else { Some(set) };
        self
    }

    /// Builder method: include or exclude ZDO traffic
    pub fn with_zdo_traffic(mut self, include: bool) -> Self {
        self.include_zdo = include;
        self
    }

    /// Builder method: keep only unsolicited traffic
    ///
    /// Unsolicited means server-to-client ZCL frames, anything on the OTA
    /// cluster (both directions carry upgrade diagnostics), and ZDO frames,
    /// which have no ZCL direction bit.
    pub fn with_unsolicited_only(mut self, enabled: bool) -> Self {
        self.unsolicited_only = enabled;
        self
    }

    /// Check one record against every configured predicate
    ///
    /// `resolved_code` is the manufacturer code already attributed to this
    /// record, from its ZCL header or the index.
    pub fn accepts(
        &self,
        record: &FrameRecord,
        header: &ZclHeader,
        resolved_code: Option<&str>,
    ) -> bool {
        if let Some(want) = &self.manufacturer {
            match resolved_code {
                Some(code) if zcl::normalize_manufacturer_code(code) == *want => {}
                _ => return false,
            }
        }
        if let Some(want) = self.device_id {
            if record.device_id != Some(want) {
                return false;
            }
        }
        if let Some(want) = &self.device_name {
            if !record.name.to_lowercase().contains(want) {
                return false;
            }
        }
        if let Some(want) = self.network_id {
            if record.network_id != Some(want) {
                return false;
            }
        }
        if let Some(clusters) = &self.clusters {
            if !clusters.contains(&record.cluster_id) {
                return false;
            }
        }
        if record.is_zdo() && !self.include_zdo {
            return false;
        }
        if self.unsolicited_only
            && !header.is_server_to_client()
            && !record.is_ota_cluster()
            && !record.is_zdo()
        {
            return false;
        }
        true
    }
}
