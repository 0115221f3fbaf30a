//! Aggregation engine
//!
//! Consumes filtered records in source order and maintains one
//! [`DeviceAggregate`] per device display name plus run-wide summary
//! histograms. Classification failures never drop a frame: a record that
//! cannot be classified further still counts toward its device total.

use crate::names::NameCatalog;
use crate::ota;
use crate::types::{FrameRecord, OtaRequest, ZclDirection, ZclFrameType, ZclHeader};
use std::collections::{BTreeMap, HashMap};

/// Counter over display labels
#[derive(Debug, Clone, Default)]
pub struct Histogram {
    counts: HashMap<String, u64>,
}

impl Histogram {
    pub fn bump(&mut self, label: impl Into<String>) {
        *self.counts.entry(label.into()).or_insert(0) += 1;
    }

    pub fn count(&self, label: &str) -> u64 {
        self.counts.get(label).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// The `n` most frequent labels, ties broken by label so output is stable
    pub fn top(&self, n: usize) -> Vec<(&str, u64)> {
        let mut entries: Vec<(&str, u64)> = self
            .counts
            .iter()
            .map(|(label, count)| (label.as_str(), *count))
            .collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        entries.truncate(n);
        entries
    }
}

/// Signal readings taken from one frame, kept together so time and RSSI
/// stay paired for the heatmap
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSample {
    pub time: Option<String>,
    pub lqi: Option<u16>,
    pub rssi: Option<i16>,
}

/// Firmware download progress inferred from inbound OTA requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum OtaPhase {
    #[default]
    Idle,
    Querying,
    Downloading,
    AwaitingUpgrade,
}

impl OtaPhase {
    pub fn label(self) -> Option<&'static str> {
        match self {
            OtaPhase::Idle => None,
            OtaPhase::Querying => Some("querying"),
            OtaPhase::Downloading => Some("downloading"),
            OtaPhase::AwaitingUpgrade => Some("awaiting_upgrade"),
        }
    }
}

/// Per-device OTA session state, driven only by client-to-server requests
///
/// Outbound responses are not correlated; the inbound side alone is enough
/// to tell who is downloading firmware and how far along they are. The
/// phase only moves forward even if a device re-queries mid-download.
#[derive(Debug, Clone, Default)]
pub struct OtaSession {
    pub phase: OtaPhase,
    pub request_manufacturer: Option<String>,
    pub request_image_type: Option<String>,
    pub request_version: Option<String>,
    pub last_offset: Option<u32>,
    pub max_block_size: Option<u8>,
    pub blocks: u64,
    pub completed: bool,
}

impl OtaSession {
    pub fn apply(&mut self, request: &OtaRequest) {
        match request {
            OtaRequest::QueryNextImage {
                manufacturer_id,
                image_type,
                file_version,
                ..
            } => {
                self.request_manufacturer = Some(format!("0x{manufacturer_id:04X}"));
                self.request_image_type = Some(format!("0x{image_type:04X}"));
                self.request_version = Some(format!("0x{file_version:08X}"));
                self.advance(OtaPhase::Querying);
            }
            OtaRequest::ImageBlock {
                file_offset,
                max_data_size,
                ..
            } => {
                self.last_offset = Some(match self.last_offset {
                    Some(prev) => prev.max(*file_offset),
                    None => *file_offset,
                });
                self.max_block_size = Some(*max_data_size);
                self.blocks += 1;
                self.advance(OtaPhase::Downloading);
            }
            OtaRequest::UpgradeEnd { .. } => {
                self.completed = true;
                self.advance(OtaPhase::AwaitingUpgrade);
            }
        }
    }

    fn advance(&mut self, phase: OtaPhase) {
        if phase > self.phase {
            self.phase = phase;
        }
    }
}

/// Everything known about one device after a run
#[derive(Debug, Clone, Default)]
pub struct DeviceAggregate {
    pub count: u64,
    pub manufacturer_code: Option<String>,
    pub device_id: Option<u64>,
    pub network_id: Option<u16>,
    pub samples: Vec<FrameSample>,
    pub per_cluster: Histogram,
    pub per_command: Histogram,
    pub per_global_command: Histogram,
    pub per_zdo: Histogram,
    pub per_ota_command: Histogram,
    pub ota: OtaSession,
}

impl DeviceAggregate {
    pub fn median_lqi(&self) -> Option<f64> {
        median(self.samples.iter().filter_map(|s| s.lqi.map(f64::from)).collect())
    }

    pub fn median_rssi(&self) -> Option<f64> {
        median(self.samples.iter().filter_map(|s| s.rssi.map(f64::from)).collect())
    }

    /// Timestamps in observation order
    pub fn times(&self) -> impl Iterator<Item = &str> {
        self.samples.iter().filter_map(|s| s.time.as_deref())
    }

    /// Timestamped RSSI readings in observation order
    pub fn rssi_samples(&self) -> impl Iterator<Item = (&str, i16)> {
        self.samples.iter().filter_map(|s| match (&s.time, s.rssi) {
            (Some(time), Some(rssi)) => Some((time.as_str(), rssi)),
            _ => None,
        })
    }
}

fn median(mut values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        Some(values[mid])
    } else {
        Some((values[mid - 1] + values[mid]) / 2.0)
    }
}

/// Run-wide histograms across every device
#[derive(Debug, Clone, Default)]
pub struct GlobalSummary {
    pub zdo: Histogram,
    pub global_commands: Histogram,
    pub ota_commands: Histogram,
}

/// Feeds filtered records into per-device aggregates and the run summary
#[derive(Debug, Clone)]
pub struct Aggregator {
    show_global_commands: bool,
    ota_details: bool,
    devices: BTreeMap<String, DeviceAggregate>,
    summary: GlobalSummary,
}

impl Aggregator {
    pub fn new(show_global_commands: bool, ota_details: bool) -> Self {
        Self {
            show_global_commands,
            ota_details,
            devices: BTreeMap::new(),
            summary: GlobalSummary::default(),
        }
    }

    /// Fold one record into the aggregates
    ///
    /// `resolved_code` is the manufacturer code attributed to this record,
    /// from its ZCL header or the index.
    pub fn observe(
        &mut self,
        record: &FrameRecord,
        header: &ZclHeader,
        resolved_code: Option<&str>,
        names: &NameCatalog,
    ) {
        let name = if record.name.is_empty() {
            "unknown"
        } else {
            record.name.as_str()
        };
        let device = self.devices.entry(name.to_string()).or_default();

        device.count += 1;
        device.samples.push(FrameSample {
            time: record.time.clone(),
            lqi: record.lqi,
            rssi: record.rssi,
        });
        if let Some(code) = resolved_code {
            device.manufacturer_code = Some(code.to_string());
        }
        if record.device_id.is_some() {
            device.device_id = record.device_id;
        }
        if record.network_id.is_some() {
            device.network_id = record.network_id;
        }

        if record.is_zdo() {
            let label = names.zdo_op(&record.cluster_id);
            device.per_zdo.bump(label.clone());
            self.summary.zdo.bump(label);
            return;
        }

        device.per_cluster.bump(record.cluster_id.clone());
        match (header.frame_type, header.command_id) {
            (Some(ZclFrameType::Global), Some(command)) if self.show_global_commands => {
                let label = names.global_command(command);
                device.per_global_command.bump(label.clone());
                self.summary.global_commands.bump(label);
            }
            (_, Some(command)) => {
                device.per_command.bump(format!("0x{command:02X}"));
            }
            _ => {}
        }

        if self.ota_details && record.is_ota_cluster() {
            if let Some(command) = header.command_id {
                let label = names.ota_command(command);
                device.per_ota_command.bump(label.clone());
                self.summary.ota_commands.bump(label);
                if header.direction == Some(ZclDirection::ClientToServer) {
                    if let Some(request) = ota::decode_ota_request(&record.payload, header) {
                        device.ota.apply(&request);
                    }
                }
            }
        }
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn into_parts(self) -> (BTreeMap<String, DeviceAggregate>, GlobalSummary) {
        (self.devices, self.summary)
    }
}
