//! Engine configuration.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default import ceiling: 50 MB.
pub const DEFAULT_MAX_IMPORT_BYTES: usize = 50 * 1024 * 1024;

/// Engine configuration.
///
/// Every field has a default, so a JSON file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Largest import input accepted, in bytes.
    pub max_import_bytes: usize,

    /// Baseline difference (layout units) that starts a new line.
    pub line_tolerance: f32,

    /// Dominant font size above which a line becomes a level-2 heading.
    pub h2_min_font_size: f32,

    /// Dominant font size above which a line becomes a level-3 heading.
    pub h3_min_font_size: f32,

    /// Start of the temporary id namespace used while renumbering footnotes.
    pub footnote_temp_base: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineConfig {
    /// Create new configuration with defaults.
    pub fn new() -> Self {
        Self {
            max_import_bytes: DEFAULT_MAX_IMPORT_BYTES,
            line_tolerance: 5.0,
            h2_min_font_size: 18.0,
            h3_min_font_size: 14.0,
            footnote_temp_base: 1_000_000,
        }
    }

    /// Load configuration from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Set the import size ceiling.
    pub fn with_max_import_bytes(mut self, bytes: usize) -> Self {
        self.max_import_bytes = bytes;
        self
    }

    /// Set the line grouping tolerance.
    pub fn with_line_tolerance(mut self, tolerance: f32) -> Self {
        self.line_tolerance = tolerance;
        self
    }

    /// Set the heading thresholds.
    pub fn with_heading_thresholds(mut self, h2: f32, h3: f32) -> Self {
        self.h2_min_font_size = h2;
        self.h3_min_font_size = h3;
        self
    }

    /// Set the temporary footnote namespace base.
    pub fn with_footnote_temp_base(mut self, base: u32) -> Self {
        self.footnote_temp_base = base;
        self
    }
}
