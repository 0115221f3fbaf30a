//! Heatmap matrix export
//!
//! Bins the top talkers' traffic into one-minute columns and writes two CSV
//! matrices: message counts per bin and median RSSI per bin. RSSI gaps are
//! forward-filled so each device row reads as a continuous signal track.

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDateTime, Timelike};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use zigbee_log_decoder::{AnalysisReport, DeviceAggregate};

const BIN_SECONDS: i64 = 60;
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Write `{prefix}_talkers.csv` and `{prefix}_rssi.csv` for the `top_n`
/// busiest devices. Creates the prefix directory if needed.
pub fn export(report: &AnalysisReport, top_n: usize, prefix: &str) -> Result<()> {
    let mut ranking = report.ranked_devices();
    ranking.truncate(top_n);
    if ranking.is_empty() {
        println!("[INFO] No devices for heatmaps.");
        return Ok(());
    }

    let bins = build_time_bins(ranking.iter().flat_map(|(_, device)| device.times()));
    if bins.is_empty() {
        println!("[INFO] No temporal data for heatmaps.");
        return Ok(());
    }

    let mut counts = vec![vec![0u64; bins.len()]; ranking.len()];
    let mut rssi = vec![vec![None::<f64>; bins.len()]; ranking.len()];
    for (row, (_, device)) in ranking.iter().enumerate() {
        fill_device_row(device, &bins, &mut counts[row], &mut rssi[row]);
    }

    if let Some(dir) = Path::new(prefix).parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        }
    }

    let talkers_path = format!("{prefix}_talkers.csv");
    write_matrix(&talkers_path, &ranking, &bins, |row, col| {
        counts[row][col].to_string()
    })?;
    println!("[OK] Talkers heatmap: {talkers_path}");

    let rssi_path = format!("{prefix}_rssi.csv");
    write_matrix(&rssi_path, &ranking, &bins, |row, col| {
        rssi[row][col].map(|v| format!("{v:.1}")).unwrap_or_default()
    })?;
    println!("[OK] RSSI heatmap: {rssi_path}");
    Ok(())
}

/// One-minute bins covering the observed time span, first bin aligned to
/// the earliest timestamp with fractional seconds dropped.
fn build_time_bins<'a>(times: impl Iterator<Item = &'a str>) -> Vec<NaiveDateTime> {
    let parsed: Vec<NaiveDateTime> = times
        .filter_map(|t| NaiveDateTime::parse_from_str(t, TIME_FORMAT).ok())
        .collect();
    let (Some(min), Some(max)) = (parsed.iter().min(), parsed.iter().max()) else {
        return Vec::new();
    };
    let end = *max + Duration::seconds(BIN_SECONDS);
    let mut cur = min.with_nanosecond(0).unwrap_or(*min);
    let mut bins = Vec::new();
    while cur <= end {
        bins.push(cur);
        cur = cur + Duration::seconds(BIN_SECONDS);
    }
    bins
}

fn fill_device_row(
    device: &DeviceAggregate,
    bins: &[NaiveDateTime],
    counts: &mut [u64],
    rssi_row: &mut [Option<f64>],
) {
    let mut per_bin: Vec<Vec<f64>> = vec![Vec::new(); bins.len()];
    for sample in &device.samples {
        let Some(time) = sample.time.as_deref() else {
            continue;
        };
        let Ok(t) = NaiveDateTime::parse_from_str(time, TIME_FORMAT) else {
            continue;
        };
        let idx = (t - bins[0]).num_seconds() / BIN_SECONDS;
        if idx < 0 || idx as usize >= bins.len() {
            continue;
        }
        let idx = idx as usize;
        counts[idx] += 1;
        if let Some(rssi) = sample.rssi {
            per_bin[idx].push(f64::from(rssi));
        }
    }
    for (idx, values) in per_bin.into_iter().enumerate() {
        rssi_row[idx] = median(values);
    }
    forward_fill(rssi_row);
}

/// Carry the last known value forward, then fill any leading gap with the
/// first known value so the row has no holes.
fn forward_fill(row: &mut [Option<f64>]) {
    let mut last = None;
    for cell in row.iter_mut() {
        match *cell {
            Some(v) => last = Some(v),
            None => *cell = last,
        }
    }
    let Some(first) = row.iter().find_map(|cell| *cell) else {
        return;
    };
    for cell in row.iter_mut() {
        if cell.is_none() {
            *cell = Some(first);
        } else {
            break;
        }
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

fn write_matrix(
    path: &str,
    ranking: &[(&str, &DeviceAggregate)],
    bins: &[NaiveDateTime],
    cell: impl Fn(usize, usize) -> String,
) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {path}"))?;
    let mut out = BufWriter::new(file);
    write!(out, "Device Label")?;
    for bin in bins {
        write!(out, ",{}", bin.format("%H:%M:%S"))?;
    }
    writeln!(out)?;
    for (row, (name, _)) in ranking.iter().enumerate() {
        write!(out, "\"{name}\"")?;
        for col in 0..bins.len() {
            write!(out, ",{}", cell(row, col))?;
        }
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::fs;
    use tempfile::tempdir;
    use zigbee_log_decoder::{FrameSample, GlobalSummary, ManufacturerIndex};

    fn frame(time: &str, rssi: Option<i16>) -> FrameSample {
        FrameSample {
            time: Some(time.to_string()),
            lqi: Some(100),
            rssi,
        }
    }

    fn report_with(devices: BTreeMap<String, DeviceAggregate>) -> AnalysisReport {
        AnalysisReport {
            devices,
            summary: GlobalSummary::default(),
            time_range: None,
            index: ManufacturerIndex::new(),
        }
    }

    #[test]
    fn exports_count_and_rssi_matrices() {
        let dir = tempdir().unwrap();
        let prefix = dir.path().join("charts").to_str().unwrap().to_string();

        let mut sensor = DeviceAggregate::default();
        sensor.count = 3;
        sensor.samples.push(frame("2024-07-14 10:00:30.000", Some(-40)));
        sensor.samples.push(frame("2024-07-14 10:00:45.000", Some(-50)));
        sensor.samples.push(frame("2024-07-14 10:02:10.000", Some(-60)));
        let mut quiet = DeviceAggregate::default();
        quiet.count = 1;
        quiet.samples.push(frame("2024-07-14 10:01:00.000", None));
        let mut devices = BTreeMap::new();
        devices.insert("Sensor".to_string(), sensor);
        devices.insert("Quiet".to_string(), quiet);

        export(&report_with(devices), 10, &prefix).unwrap();

        let talkers = fs::read_to_string(format!("{prefix}_talkers.csv")).unwrap();
        let mut lines = talkers.lines();
        assert_eq!(lines.next().unwrap(), "Device Label,10:00:30,10:01:30,10:02:30");
        assert_eq!(lines.next().unwrap(), "\"Sensor\",2,1,0");
        assert_eq!(lines.next().unwrap(), "\"Quiet\",1,0,0");
        assert!(lines.next().is_none());

        let rssi = fs::read_to_string(format!("{prefix}_rssi.csv")).unwrap();
        let mut lines = rssi.lines();
        assert_eq!(lines.next().unwrap(), "Device Label,10:00:30,10:01:30,10:02:30");
        assert_eq!(lines.next().unwrap(), "\"Sensor\",-45.0,-60.0,-60.0");
        assert_eq!(lines.next().unwrap(), "\"Quiet\",,,");
    }

    #[test]
    fn rssi_rows_backfill_leading_gaps() {
        let dir = tempdir().unwrap();
        let prefix = dir.path().join("charts").to_str().unwrap().to_string();

        let mut sensor = DeviceAggregate::default();
        sensor.count = 2;
        sensor.samples.push(frame("2024-07-14 10:00:30.000", None));
        sensor.samples.push(frame("2024-07-14 10:02:10.000", Some(-60)));
        let mut devices = BTreeMap::new();
        devices.insert("Sensor".to_string(), sensor);

        export(&report_with(devices), 10, &prefix).unwrap();

        let rssi = fs::read_to_string(format!("{prefix}_rssi.csv")).unwrap();
        assert_eq!(rssi.lines().nth(1).unwrap(), "\"Sensor\",-60.0,-60.0,-60.0");
    }

    #[test]
    fn bins_cover_only_the_ranked_devices() {
        let dir = tempdir().unwrap();
        let prefix = dir.path().join("charts").to_str().unwrap().to_string();

        let mut busy = DeviceAggregate::default();
        busy.count = 2;
        busy.samples.push(frame("2024-07-14 10:00:00.000", Some(-40)));
        busy.samples.push(frame("2024-07-14 10:00:30.000", Some(-41)));
        let mut late = DeviceAggregate::default();
        late.count = 1;
        late.samples.push(frame("2024-07-14 23:00:00.000", Some(-70)));
        let mut devices = BTreeMap::new();
        devices.insert("Busy".to_string(), busy);
        devices.insert("Late".to_string(), late);

        export(&report_with(devices), 1, &prefix).unwrap();

        let talkers = fs::read_to_string(format!("{prefix}_talkers.csv")).unwrap();
        let header = talkers.lines().next().unwrap();
        assert!(!header.contains("23:"));
        assert_eq!(talkers.lines().count(), 2);
    }

    #[test]
    fn skips_export_without_usable_timestamps() {
        let dir = tempdir().unwrap();
        let prefix = dir.path().join("charts").to_str().unwrap().to_string();

        let mut sensor = DeviceAggregate::default();
        sensor.count = 1;
        sensor.samples.push(FrameSample {
            time: None,
            lqi: None,
            rssi: None,
        });
        let mut devices = BTreeMap::new();
        devices.insert("Sensor".to_string(), sensor);

        export(&report_with(devices), 10, &prefix).unwrap();
        assert!(!Path::new(&format!("{prefix}_talkers.csv")).exists());

        export(&report_with(BTreeMap::new()), 10, &prefix).unwrap();
        assert!(!Path::new(&format!("{prefix}_rssi.csv")).exists());
    }
}
