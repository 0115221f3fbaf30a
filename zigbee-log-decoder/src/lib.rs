//! Zigbee Log Decoder Library
//!
//! A reusable library for decoding Hubitat Zigbee radio logs: ZCL header
//! and OTA request parsing plus per-device traffic aggregation.
//!
//! # Architecture
//!
//! This library is intentionally minimal and focused on decoding:
//! - Normalizes text and JSON capture lines into one record shape
//! - Decodes ZCL frame headers and inbound OTA upgrade requests
//! - Resolves manufacturer codes through a two-pass index with an
//!   optional persisted cache
//! - Filters and aggregates traffic into per-device statistics
//!
//! The library does NOT:
//! - Render tables, CSV, or heatmaps
//! - Talk to a hub
//! - Parse command lines
//!
//! All higher-level functionality is in the application layer
//! (zigbee-log-cli).
//!
//! # Example Usage
//!
//! ```no_run
//! use zigbee_log_decoder::{AnalysisOptions, Analyzer, FrameFilter, NameCatalog};
//! use std::path::Path;
//!
//! // Keep unsolicited traffic only and follow OTA downloads
//! let options = AnalysisOptions::new()
//!     .with_filter(FrameFilter::new().with_unsolicited_only(true))
//!     .with_ota_details(true);
//!
//! let analyzer = Analyzer::new(options, NameCatalog::new());
//! let report = analyzer.run(Path::new("zigbee.log")).unwrap();
//!
//! for (name, device) in report.ranked_devices() {
//!     println!("{name}: {} frames", device.count);
//! }
//! ```

// Public modules
pub mod aggregate;
pub mod analysis;
pub mod config;
pub mod filter;
pub mod index;
pub mod names;
pub mod normalize;
pub mod ota;
pub mod types;
pub mod zcl;

// Re-export main types for convenience
pub use aggregate::{
    DeviceAggregate, FrameSample, GlobalSummary, Histogram, OtaPhase, OtaSession,
};
pub use analysis::{AnalysisReport, Analyzer};
pub use config::AnalysisOptions;
pub use filter::FrameFilter;
pub use index::ManufacturerIndex;
pub use names::NameCatalog;
pub use normalize::LineNormalizer;
pub use types::{
    DecoderError, FrameRecord, OtaRequest, Result, ZclDirection, ZclFrameType, ZclHeader,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
