//! Analysis run configuration
//!
//! Options controlling one analysis run over a capture file. Rendering
//! concerns (table vs CSV, heatmap export) live with the consumers; the
//! engine only needs to know what to keep and how deep to classify.

use crate::filter::FrameFilter;
use std::path::PathBuf;

/// Configuration for one analysis run
#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    /// Record predicates applied between normalization and aggregation
    pub filter: FrameFilter,

    /// Copy the raw text of every surviving line to this file
    pub output_file: Option<PathBuf>,

    /// Persisted manufacturer index location; reused when present,
    /// written after a from-scratch build
    pub index_cache: Option<PathBuf>,

    /// Count ZCL global commands under their own named histogram instead
    /// of the raw command-id histogram
    pub show_global_commands: bool,

    /// Track per-device OTA command histograms and download sessions
    pub ota_details: bool,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            filter: FrameFilter::default(),
            output_file: None,
            index_cache: None,
            show_global_commands: true,
            ota_details: false,
        }
    }
}

impl AnalysisOptions {
    /// Create options with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the record filter
    pub fn with_filter(mut self, filter: FrameFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Builder method: copy surviving raw lines to a file
    pub fn with_output_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_file = Some(path.into());
        self
    }

    /// Builder method: persist and reuse the manufacturer index
    pub fn with_index_cache(mut self, path: impl Into<PathBuf>) -> Self {
        self.index_cache = Some(path.into());
        self
    }

    /// Builder method: enable or disable the named global-command histogram
    pub fn with_global_commands(mut self, enabled: bool) -> Self {
        self.show_global_commands = enabled;
        self
    }

    /// Builder method: enable OTA command histograms and session tracking
    pub fn with_ota_details(mut self, enabled: bool) -> Self {
        self.ota_details = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_analysis_options_builder() {
        let options = AnalysisOptions::new()
            .with_filter(FrameFilter::new().with_unsolicited_only(true))
            .with_output_file("filtered.log")
            .with_index_cache("index.json")
            .with_global_commands(false)
            .with_ota_details(true);

        assert!(options.filter.unsolicited_only);
        assert_eq!(options.output_file.as_deref(), Some(Path::new("filtered.log")));
        assert_eq!(options.index_cache.as_deref(), Some(Path::new("index.json")));
        assert!(!options.show_global_commands);
        assert!(options.ota_details);
    }

    #[test]
    fn test_defaults() {
        let options = AnalysisOptions::new();
        assert!(options.show_global_commands);
        assert!(!options.ota_details);
        assert!(options.filter.include_zdo);
        assert!(options.output_file.is_none());
    }
}
