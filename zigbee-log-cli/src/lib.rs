//! Zigbee log CLI support modules
//!
//! Rendering and hub connectivity shared by the analyzer binary and the
//! capture/push utilities. All decoding and aggregation lives in the
//! zigbee-log-decoder library.

pub mod heatmap;
pub mod hub;
pub mod report;
