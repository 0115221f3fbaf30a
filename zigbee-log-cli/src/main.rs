//! Zigbee Log Analyzer CLI Application
//!
//! This is the command-line interface for the Hubitat Zigbee radio log
//! analyzer. It uses the zigbee-log-decoder library and adds:
//! - Device table and CSV rendering
//! - Top-talker and RSSI heatmap matrix export
//! - Manufacturer database loading
//! - Filtered raw-line export

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use zigbee_log_cli::{heatmap, report};
use zigbee_log_decoder::{AnalysisOptions, Analyzer, FrameFilter, NameCatalog};

/// Zigbee Log Analyzer - decode and aggregate Hubitat radio logs
#[derive(Parser, Debug)]
#[command(name = "zigbee-log-cli")]
#[command(about = "Zigbee (Hubitat) log analyzer - ZDO, global commands, OTA inbound sniff, heatmaps", long_about = None)]
#[command(version)]
struct Args {
    /// Path to Zigbee log file
    #[arg(value_name = "FILE")]
    logfile: PathBuf,

    /// Filter by manufacturer code (hex, e.g. 119C)
    #[arg(short, long, value_name = "CODE")]
    manufacturer: Option<String>,

    /// Path to manufacturer DB (JSON {code: name})
    #[arg(long, value_name = "FILE")]
    manufacturer_db: Option<PathBuf>,

    /// Filter by hub device ID (decimal)
    #[arg(short, long, value_name = "ID")]
    device_id: Option<u64>,

    /// Filter by device name (substring match)
    #[arg(short = 'n', long, value_name = "NAME")]
    device_name: Option<String>,

    /// Filter by device network ID (hex, e.g. 78E0 or 0x78E0)
    #[arg(long, value_name = "DNI")]
    dni: Option<String>,

    /// Limit to specific clusters (hex, e.g. 0402 0500)
    #[arg(long, value_name = "CLUSTER", num_args = 1..)]
    clusters: Vec<String>,

    /// Write filtered raw log lines to this file
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Output CSV instead of a table
    #[arg(long)]
    csv: bool,

    /// Keep only server-to-client frames (reports/notifications); OTA always included
    #[arg(long)]
    unsolicited_only: bool,

    /// JSON path for the network-address to manufacturer cache (read/write)
    #[arg(long, value_name = "FILE")]
    index_cache: Option<PathBuf>,

    /// Export top-talker and RSSI heatmap matrices (CSV)
    #[arg(long)]
    heatmap: bool,

    /// Number of devices in heatmaps
    #[arg(long, value_name = "COUNT", default_value_t = 10)]
    top_talkers: usize,

    /// Heatmap file prefix (e.g. reports/charts)
    #[arg(long, value_name = "PREFIX", default_value = "charts")]
    heatmap_prefix: String,

    /// Exclude ZDO traffic (profile 0000)
    #[arg(long)]
    exclude_zdo: bool,

    /// Count ZCL global commands under their raw command ids
    #[arg(long)]
    no_global: bool,

    /// Show per-device OTA command breakdown and inbound-only metadata
    #[arg(long)]
    ota_details: bool,

    /// Verbosity level (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    log::info!("Zigbee Log Analyzer CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using decoder library v{}", zigbee_log_decoder::VERSION);

    let mut names = NameCatalog::new();
    if let Some(db_path) = &args.manufacturer_db {
        if let Err(e) = names.load_manufacturer_db(db_path) {
            log::warn!("Could not load manufacturer DB {:?}: {}", db_path, e);
        }
    }

    let dni = match &args.dni {
        Some(raw) => Some(parse_dni(raw)?),
        None => None,
    };

    let mut filter = FrameFilter::new()
        .with_zdo_traffic(!args.exclude_zdo)
        .with_unsolicited_only(args.unsolicited_only)
        .with_clusters(&args.clusters);
    if let Some(code) = &args.manufacturer {
        filter = filter.with_manufacturer(code);
    }
    if let Some(id) = args.device_id {
        filter = filter.with_device_id(id);
    }
    if let Some(name) = &args.device_name {
        filter = filter.with_device_name(name);
    }
    if let Some(id) = dni {
        filter = filter.with_network_id(id);
    }

    let mut options = AnalysisOptions::new()
        .with_filter(filter)
        .with_global_commands(!args.no_global)
        .with_ota_details(args.ota_details);
    if let Some(path) = &args.output {
        options = options.with_output_file(path);
    }
    if let Some(path) = &args.index_cache {
        options = options.with_index_cache(path);
    }

    let analyzer = Analyzer::new(options, names);
    let analysis = analyzer
        .run(&args.logfile)
        .with_context(|| format!("analyzing {}", args.logfile.display()))?;

    if analysis.is_empty() {
        eprintln!("No frames matched the criteria.");
        std::process::exit(1);
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if args.csv {
        report::render_csv(&mut out, &analysis, analyzer.names())?;
    } else {
        let parts = filter_echo(&args, dni);
        report::render_table(&mut out, &analysis, analyzer.names(), &parts)?;
    }

    if args.heatmap {
        heatmap::export(&analysis, args.top_talkers, &args.heatmap_prefix)?;
    }

    Ok(())
}

/// Accepts 78E0 and 0x78E0 forms
fn parse_dni(raw: &str) -> Result<u16> {
    let cleaned = raw.trim().trim_start_matches("0x").trim_start_matches("0X");
    u16::from_str_radix(cleaned, 16)
        .with_context(|| format!("invalid network ID '{raw}', expected hex like 78E0 or 0x78E0"))
}

/// Filter settings echoed in the table header
fn filter_echo(args: &Args, dni: Option<u16>) -> Vec<String> {
    let mut parts = Vec::new();
    if let Some(code) = &args.manufacturer {
        parts.push(format!("manufacturer={code}"));
    }
    if let Some(id) = dni {
        parts.push(format!("dni=0x{id:04X}"));
    }
    if let Some(id) = args.device_id {
        parts.push(format!("device_id={id}"));
    }
    if let Some(name) = &args.device_name {
        parts.push(format!("name contains '{name}'"));
    }
    if !args.clusters.is_empty() {
        parts.push(format!("clusters={}", args.clusters.join(",")));
    }
    parts
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dni_forms() {
        assert_eq!(parse_dni("78E0").unwrap(), 0x78E0);
        assert_eq!(parse_dni("0x78e0").unwrap(), 0x78E0);
        assert_eq!(parse_dni(" 0X78E0 ").unwrap(), 0x78E0);
        assert!(parse_dni("wxyz").is_err());
    }

    #[test]
    fn echoes_filters_in_order() {
        let args = Args::try_parse_from([
            "zigbee-log-cli",
            "radio.log",
            "-m",
            "119C",
            "--device-name",
            "Thermo",
            "--clusters",
            "0201",
            "0402",
        ])
        .unwrap();
        let parts = filter_echo(&args, Some(0x78E0));
        assert_eq!(
            parts,
            vec![
                "manufacturer=119C".to_string(),
                "dni=0x78E0".to_string(),
                "name contains 'Thermo'".to_string(),
                "clusters=0201,0402".to_string(),
            ]
        );
    }
}
