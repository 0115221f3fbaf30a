//! Report rendering
//!
//! Text table and CSV views over an [`AnalysisReport`]. Both write to a
//! generic `io::Write` sink so the binary can lock stdout and tests can
//! render into a buffer.

use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::io::{self, Write};
use zigbee_log_decoder::{AnalysisReport, Histogram, NameCatalog};

const RULE_WIDTH: usize = 118;
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Render the per-device table plus run-wide summary sections.
///
/// `filter_parts` is echoed under the title so a saved report records which
/// filters produced it.
pub fn render_table(
    out: &mut impl Write,
    report: &AnalysisReport,
    names: &NameCatalog,
    filter_parts: &[String],
) -> io::Result<()> {
    writeln!(out, "Zigbee Analysis — Unsolicited frames (and OTA)")?;
    writeln!(out, "{}", "=".repeat(RULE_WIDTH))?;
    if let Some((start, end)) = &report.time_range {
        match duration_between(start, end) {
            Some((hours, minutes)) => writeln!(
                out,
                "Time range: {start} → {end} (duration {hours}h {minutes}m)"
            )?,
            None => writeln!(out, "Time range: {start} → {end}")?,
        }
    }
    if !filter_parts.is_empty() {
        writeln!(out, "Filters: {}", filter_parts.join(", "))?;
    }
    writeln!(out)?;

    writeln!(
        out,
        "{:<34} {:<6} {:<28} {:>6} {:>7} {:>8}  Top clusters (count)",
        "Device Label", "Mfr", "Manufacturer", "Count", "Med LQI", "Med RSSI"
    )?;
    writeln!(out, "{}", "-".repeat(RULE_WIDTH))?;
    for (name, device) in report.ranked_devices() {
        let code = device.manufacturer_code.as_deref().unwrap_or("");
        let top_clusters = device
            .per_cluster
            .top(3)
            .into_iter()
            .map(|(cluster, n)| format!("{}({n})", names.cluster(cluster)))
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(
            out,
            "{:<34} {:<6} {:<28} {:>6} {:>7.0} {:>8.0}  {}",
            name,
            code,
            names.manufacturer(code),
            device.count,
            device.median_lqi().unwrap_or(0.0),
            device.median_rssi().unwrap_or(0.0),
            top_clusters
        )?;
    }
    writeln!(out, "{}", "-".repeat(RULE_WIDTH))?;
    writeln!(
        out,
        "{:<34} {:<6} {:<28} {:>6}",
        "TOTAL",
        "",
        "",
        report.total_frames()
    )?;

    write_top_section(out, "Top ZCL Global Commands:", &report.summary.global_commands)?;
    write_top_section(out, "Top ZDO Operations:", &report.summary.zdo)?;
    write_top_section(out, "Top OTA Commands:", &report.summary.ota_commands)?;

    let mut phases: HashMap<&str, u64> = HashMap::new();
    for device in report.devices.values() {
        if let Some(label) = device.ota.phase.label() {
            *phases.entry(label).or_insert(0) += 1;
        }
    }
    if !phases.is_empty() {
        let mut entries: Vec<(&str, u64)> = phases.into_iter().collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        writeln!(out)?;
        writeln!(out, "OTA (inbound-only) phases:")?;
        for (phase, n) in entries {
            writeln!(out, "  {phase:<20} {n:>6}")?;
        }
    }
    Ok(())
}

const CSV_HEADER: &str = "Device Label,Mfr Code,Manufacturer,Count,Median LQI,Median RSSI,\
Network ID,Device ID,TopClusters,TopGlobalCmds,TopZDO,TopOTA,\
OTA Req Mfr,OTA Req ImageType,OTA Req CurrentVersion,OTA LastOffset,\
OTA MaxBlock,OTA Blocks,OTA Phase,OTA Completed";

/// Render one CSV row per device, ordered by frame count.
///
/// Device labels and top-N lists are quoted since labels routinely contain
/// commas; the remaining fields never do. Absent values render as empty
/// fields rather than a placeholder word.
pub fn render_csv(
    out: &mut impl Write,
    report: &AnalysisReport,
    names: &NameCatalog,
) -> io::Result<()> {
    writeln!(out, "{CSV_HEADER}")?;
    for (name, device) in report.ranked_devices() {
        let code = device.manufacturer_code.as_deref().unwrap_or("");
        let network_id = device
            .network_id
            .map(|id| format!("0x{id:04X}"))
            .unwrap_or_default();
        let device_id = device
            .device_id
            .map(|id| id.to_string())
            .unwrap_or_default();
        let top_clusters = join_top(&device.per_cluster, |c| names.cluster(c).to_string());
        let top_globals = join_top(&device.per_global_command, str::to_string);
        let top_zdo = join_top(&device.per_zdo, str::to_string);
        let top_ota = join_top(&device.per_ota_command, str::to_string);
        let ota = &device.ota;
        writeln!(
            out,
            "\"{name}\",{code},{mfr_name},{count},{lqi:.0},{rssi:.0},{network_id},{device_id},\
             \"{top_clusters}\",\"{top_globals}\",\"{top_zdo}\",\"{top_ota}\",\
             {req_mfr},{req_image},{req_version},{last_offset},{max_block},{blocks},{phase},{completed}",
            mfr_name = names.manufacturer(code),
            count = device.count,
            lqi = device.median_lqi().unwrap_or(0.0),
            rssi = device.median_rssi().unwrap_or(0.0),
            req_mfr = ota.request_manufacturer.as_deref().unwrap_or(""),
            req_image = ota.request_image_type.as_deref().unwrap_or(""),
            req_version = ota.request_version.as_deref().unwrap_or(""),
            last_offset = ota.last_offset.map(|v| v.to_string()).unwrap_or_default(),
            max_block = ota.max_block_size.map(|v| v.to_string()).unwrap_or_default(),
            blocks = if ota.blocks > 0 {
                ota.blocks.to_string()
            } else {
                String::new()
            },
            phase = ota.phase.label().unwrap_or(""),
            completed = if ota.completed { "true" } else { "" },
        )?;
    }
    Ok(())
}

fn duration_between(start: &str, end: &str) -> Option<(i64, i64)> {
    let t1 = NaiveDateTime::parse_from_str(start, TIME_FORMAT).ok()?;
    let t2 = NaiveDateTime::parse_from_str(end, TIME_FORMAT).ok()?;
    let total = (t2 - t1).num_seconds();
    Some((total / 3600, total % 3600 / 60))
}

fn write_top_section(out: &mut impl Write, title: &str, histogram: &Histogram) -> io::Result<()> {
    if histogram.is_empty() {
        return Ok(());
    }
    writeln!(out)?;
    writeln!(out, "{title}")?;
    for (label, n) in histogram.top(10) {
        writeln!(out, "  {label:<36} {n:>6}")?;
    }
    Ok(())
}

fn join_top<F>(histogram: &Histogram, label: F) -> String
where
    F: Fn(&str) -> String,
{
    histogram
        .top(3)
        .into_iter()
        .map(|(key, n)| format!("{}({n})", label(key)))
        .collect::<Vec<_>>()
        .join(";")
}
