//! Two-pass log analysis
//!
//! Pass 1 builds (or loads) the manufacturer index; pass 2 streams the log
//! through normalization, ZCL decoding, the filter chain, and aggregation.
//! Both passes read the source in line order, so per-device state reflects
//! capture order exactly.

use crate::aggregate::{Aggregator, DeviceAggregate, GlobalSummary};
use crate::config::AnalysisOptions;
use crate::index::ManufacturerIndex;
use crate::names::NameCatalog;
use crate::normalize::LineNormalizer;
use crate::types::{DecoderError, Result};
use crate::zcl;
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Drives both passes over one capture file
pub struct Analyzer {
    options: AnalysisOptions,
    names: NameCatalog,
    normalizer: LineNormalizer,
}

impl Analyzer {
    pub fn new(options: AnalysisOptions, names: NameCatalog) -> Self {
        Self {
            options,
            names,
            normalizer: LineNormalizer::new(),
        }
    }

    /// Analyze the log and return the aggregated snapshot
    pub fn run(&self, log_path: &Path) -> Result<AnalysisReport> {
        let index = self.load_or_build_index(log_path)?;

        let file = File::open(log_path)
            .map_err(|e| DecoderError::LogReadError(format!("{}: {e}", log_path.display())))?;
        let reader = BufReader::new(file);

        let mut sink = match &self.options.output_file {
            Some(path) => Some(BufWriter::new(File::create(path)?)),
            None => None,
        };

        let mut aggregator = Aggregator::new(
            self.options.show_global_commands,
            self.options.ota_details,
        );
        let mut first_time: Option<String> = None;
        let mut last_time: Option<String> = None;
        let mut kept: u64 = 0;

        for line in reader.lines() {
            let line = line?;
            let Some(record) = self.normalizer.normalize(&line) else {
                continue;
            };

            let header = zcl::decode_zcl_header(&record.payload);
            let resolved = header.manufacturer_code_hex().or_else(|| {
                record
                    .network_id
                    .and_then(|id| index.lookup(id).map(str::to_string))
            });

            if !self
                .options
                .filter
                .accepts(&record, &header, resolved.as_deref())
            {
                continue;
            }

            if let Some(sink) = &mut sink {
                writeln!(sink, "{line}")?;
            }

            if let Some(time) = &record.time {
                if first_time.as_deref().map_or(true, |t| time.as_str() < t) {
                    first_time = Some(time.clone());
                }
                if last_time.as_deref().map_or(true, |t| time.as_str() > t) {
                    last_time = Some(time.clone());
                }
            }

            aggregator.observe(&record, &header, resolved.as_deref(), &self.names);
            kept += 1;
        }

        if let Some(mut sink) = sink {
            sink.flush()?;
        }

        let (devices, summary) = aggregator.into_parts();
        info!(
            "Aggregated {} frames across {} devices from {}",
            kept,
            devices.len(),
            log_path.display()
        );
        Ok(AnalysisReport {
            devices,
            summary,
            time_range: first_time.zip(last_time),
            index,
        })
    }

    pub fn names(&self) -> &NameCatalog {
        &self.names
    }

    /// Reuse the cached index when it loads cleanly; otherwise scan the log
    /// and persist the result if a cache path is configured. Cache failures
    /// in either direction are warnings, never fatal.
    fn load_or_build_index(&self, log_path: &Path) -> Result<ManufacturerIndex> {
        if let Some(cache) = &self.options.index_cache {
            if cache.exists() {
                match ManufacturerIndex::load_cache(cache) {
                    Ok(index) => {
                        debug!(
                            "Loaded {} manufacturer entries from cache {}",
                            index.len(),
                            cache.display()
                        );
                        return Ok(index);
                    }
                    Err(e) => warn!("Could not read index cache, rebuilding: {e}"),
                }
            }
        }

        let index = ManufacturerIndex::from_log(log_path, &self.normalizer)?;
        if let Some(cache) = &self.options.index_cache {
            match index.save_cache(cache) {
                Ok(()) => debug!("Wrote manufacturer index cache to {}", cache.display()),
                Err(e) => warn!("Could not write index cache: {e}"),
            }
        }
        Ok(index)
    }
}

/// Aggregated snapshot of one analysis run
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    /// Per-device aggregates keyed by display name
    pub devices: BTreeMap<String, DeviceAggregate>,
    /// Cross-device histograms
    pub summary: GlobalSummary,
    /// Earliest and latest timestamp among kept frames
    pub time_range: Option<(String, String)>,
    /// The manufacturer index the run resolved against
    pub index: ManufacturerIndex,
}

impl AnalysisReport {
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Devices ordered busiest first, ties broken by name
    pub fn ranked_devices(&self) -> Vec<(&str, &DeviceAggregate)> {
        let mut ranked: Vec<(&str, &DeviceAggregate)> = self
            .devices
            .iter()
            .map(|(name, device)| (name.as_str(), device))
            .collect();
        ranked.sort_by(|a, b| b.1.count.cmp(&a.1.count).then_with(|| a.0.cmp(b.0)));
        ranked
    }

    /// Total frames kept across all devices
    pub fn total_frames(&self) -> u64 {
        self.devices.values().map(|d| d.count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::OtaPhase;
    use crate::filter::FrameFilter;
    use std::io::Write as _;
    use tempfile::tempdir;

    fn frame_line(
        name: &str,
        id: u16,
        cluster: &str,
        lqi: u16,
        rssi: i16,
        time: &str,
        payload: &str,
    ) -> String {
        format!(
            "name {name} id {id} profileId 0104 clusterId {cluster} sourceEndpoint 01 \
             destinationEndpoint 01 groupId 0000 sequence 4F lastHopLqi {lqi} \
             lastHopRssi {rssi} time {time} type physical deviceId 7 payload {payload}"
        )
    }

    fn write_sample_log(path: &Path) {
        let mut file = File::create(path).unwrap();
        // thermostat: manufacturer-specific reports plus polling we drop
        writeln!(
            file,
            "{}",
            frame_line("Thermostat", 25107, "0201", 200, -40, "2024-03-01 10:00:01.000", "1C 9C 11 33 0A")
        )
        .unwrap();
        writeln!(
            file,
            "{}",
            frame_line("Thermostat", 25107, "0201", 100, -50, "2024-03-01 10:00:02.000", "1C 9C 11 34 0A")
        )
        .unwrap();
        writeln!(
            file,
            "{}",
            frame_line("Thermostat", 25107, "0201", 90, -60, "2024-03-01 10:00:03.000", "10 35 00")
        )
        .unwrap();
        writeln!(
            file,
            "{}",
            frame_line("Thermostat", 25107, "0006", 90, -60, "2024-03-01 10:00:04.000", "10 36 01")
        )
        .unwrap();
        // bulb: inbound OTA query, kept by the unsolicited rule
        writeln!(
            file,
            "{}",
            frame_line("Bulb", 9001, "0019", 180, -70, "2024-03-01 10:00:05.000", "01 42 01 00 33 12 01 00 05 00 00 00")
        )
        .unwrap();
    }

    #[test]
    fn test_unsolicited_run_end_to_end() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("capture.log");
        write_sample_log(&log);

        let options = AnalysisOptions::new()
            .with_filter(FrameFilter::new().with_unsolicited_only(true))
            .with_ota_details(true);
        let report = Analyzer::new(options, NameCatalog::new()).run(&log).unwrap();

        assert_eq!(report.index.lookup(25107), Some("119C"));
        assert_eq!(report.index.lookup(9001), Some("1233"));

        assert_eq!(report.devices.len(), 2);
        let thermostat = &report.devices["Thermostat"];
        assert_eq!(thermostat.count, 2);
        assert_eq!(thermostat.median_lqi(), Some(150.0));
        assert_eq!(thermostat.median_rssi(), Some(-45.0));
        assert_eq!(thermostat.manufacturer_code.as_deref(), Some("119C"));

        let bulb = &report.devices["Bulb"];
        assert_eq!(bulb.count, 1);
        assert_eq!(bulb.median_lqi(), Some(180.0));
        assert_eq!(bulb.manufacturer_code.as_deref(), Some("1233"));
        assert_eq!(bulb.ota.phase, OtaPhase::Querying);

        let ranked = report.ranked_devices();
        assert_eq!(ranked[0].0, "Thermostat");
        assert_eq!(report.total_frames(), 3);
        assert_eq!(
            report.time_range,
            Some((
                "2024-03-01 10:00:01.000".to_string(),
                "2024-03-01 10:00:05.000".to_string()
            ))
        );
    }

    #[test]
    fn test_filtered_lines_copied_to_sink() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("capture.log");
        write_sample_log(&log);
        let out = dir.path().join("filtered.log");

        let options = AnalysisOptions::new()
            .with_filter(FrameFilter::new().with_unsolicited_only(true))
            .with_output_file(&out);
        Analyzer::new(options, NameCatalog::new()).run(&log).unwrap();

        let copied = std::fs::read_to_string(&out).unwrap();
        assert_eq!(copied.lines().count(), 3);
        assert!(copied.contains("name Bulb"));
        assert!(!copied.contains("payload 10 35 00"));
    }

    #[test]
    fn test_corrupt_cache_rebuilt_and_overwritten() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("capture.log");
        write_sample_log(&log);
        let cache = dir.path().join("index.json");
        std::fs::write(&cache, "{ definitely not json").unwrap();

        let options = AnalysisOptions::new().with_index_cache(&cache);
        let report = Analyzer::new(options, NameCatalog::new()).run(&log).unwrap();
        assert_eq!(report.index.lookup(25107), Some("119C"));

        // the bad cache was replaced by the rebuilt index
        let reloaded = ManufacturerIndex::load_cache(&cache).unwrap();
        assert_eq!(reloaded.lookup(25107), Some("119C"));
        assert_eq!(reloaded.lookup(9001), Some("1233"));
    }

    #[test]
    fn test_cache_skips_rescan() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("capture.log");
        write_sample_log(&log);
        let cache = dir.path().join("index.json");

        // seed a cache that disagrees with the log on purpose
        let mut seeded = ManufacturerIndex::new();
        seeded.record(25107, "AAAA");
        seeded.save_cache(&cache).unwrap();

        let options = AnalysisOptions::new().with_index_cache(&cache);
        let report = Analyzer::new(options, NameCatalog::new()).run(&log).unwrap();
        // header codes still win during pass 2; the index kept the cached value
        assert_eq!(report.index.lookup(25107), Some("AAAA"));
        assert_eq!(report.index.lookup(9001), None);
    }

    #[test]
    fn test_missing_log_is_fatal() {
        let report = Analyzer::new(AnalysisOptions::new(), NameCatalog::new())
            .run(Path::new("/nonexistent/capture.log"));
        assert!(matches!(report, Err(DecoderError::LogReadError(_))));
    }
}
