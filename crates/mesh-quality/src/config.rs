//! Thresholds and report configuration.
//!
//! Both types serialize with serde so a run can be described by a JSON file:
//!
//! ```json
//! {
//!   "thresholds": { "bad_shape_quality": 0.15, "bad_min_angle": 8.0 },
//!   "report": { "npz": false, "parquet": false }
//! }
//! ```
//!
//! Missing fields fall back to their defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{MeshError, MeshResult};

/// Default shape-quality threshold below which a triangle is flagged.
pub const DEFAULT_BAD_SHAPE_QUALITY: f64 = 0.2;

/// Default minimum-angle threshold (degrees) below which a triangle is flagged.
pub const DEFAULT_BAD_MIN_ANGLE: f64 = 10.0;

/// Thresholds for the bad-triangle classification.
///
/// A triangle is bad when **either** test fails.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityThresholds {
    /// Flag triangles with `shape_quality` strictly below this value.
    pub bad_shape_quality: f64,
    /// Flag triangles with `min_angle` (degrees) strictly below this value.
    pub bad_min_angle: f64,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            bad_shape_quality: DEFAULT_BAD_SHAPE_QUALITY,
            bad_min_angle: DEFAULT_BAD_MIN_ANGLE,
        }
    }
}

impl QualityThresholds {
    /// Create thresholds from explicit values.
    pub fn new(bad_shape_quality: f64, bad_min_angle: f64) -> Self {
        Self {
            bad_shape_quality,
            bad_min_angle,
        }
    }

    /// Set the shape-quality threshold.
    pub fn with_shape_quality(mut self, threshold: f64) -> Self {
        self.bad_shape_quality = threshold;
        self
    }

    /// Set the minimum-angle threshold in degrees.
    pub fn with_min_angle(mut self, degrees: f64) -> Self {
        self.bad_min_angle = degrees;
        self
    }

    /// Reject NaN or infinite thresholds.
    pub fn validate(&self) -> MeshResult<()> {
        if !self.bad_shape_quality.is_finite() {
            return Err(MeshError::invalid_config(format!(
                "shape-quality threshold must be finite, got {}",
                self.bad_shape_quality
            )));
        }
        if !self.bad_min_angle.is_finite() {
            return Err(MeshError::invalid_config(format!(
                "minimum-angle threshold must be finite, got {}",
                self.bad_min_angle
            )));
        }
        Ok(())
    }
}

/// Which report files to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportOptions {
    /// Per-face table as CSV (`<prefix>_faces.csv`).
    pub csv: bool,
    /// Per-face table as a compressed NPZ bundle (`<prefix>_faces.npz`).
    pub npz: bool,
    /// Per-face table as Parquet (`<prefix>_faces.parquet`). Needs the `parquet` feature.
    pub parquet: bool,
    /// Summary statistics as JSON (`<prefix>_summary.json`).
    pub summary_json: bool,
    /// Flagged faces as CSV (`<prefix>_bad_faces.csv`), written when any exist.
    pub bad_faces: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            csv: true,
            npz: true,
            parquet: false,
            summary_json: true,
            bad_faces: true,
        }
    }
}

impl ReportOptions {
    /// Options that write nothing.
    pub fn none() -> Self {
        Self {
            csv: false,
            npz: false,
            parquet: false,
            summary_json: false,
            bad_faces: false,
        }
    }

    /// Enable or disable the CSV table.
    pub fn csv(mut self, enabled: bool) -> Self {
        self.csv = enabled;
        self
    }

    /// Enable or disable the NPZ bundle.
    pub fn npz(mut self, enabled: bool) -> Self {
        self.npz = enabled;
        self
    }

    /// Enable or disable the Parquet table.
    pub fn parquet(mut self, enabled: bool) -> Self {
        self.parquet = enabled;
        self
    }

    /// Enable or disable the summary JSON.
    pub fn summary_json(mut self, enabled: bool) -> Self {
        self.summary_json = enabled;
        self
    }

    /// Enable or disable the bad-faces CSV.
    pub fn bad_faces(mut self, enabled: bool) -> Self {
        self.bad_faces = enabled;
        self
    }

    /// True when at least one file would be written.
    pub fn writes_anything(&self) -> bool {
        self.csv || self.npz || self.parquet || self.summary_json || self.bad_faces
    }
}

/// A full run configuration as stored in a JSON file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QcConfig {
    /// Bad-triangle thresholds.
    pub thresholds: QualityThresholds,
    /// Report files to write.
    pub report: ReportOptions,
}

impl QcConfig {
    /// Parse a configuration from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json_str)
    }

    /// Serialize to a pretty JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> MeshResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| MeshError::io_read(path, e))?;
        let config =
            Self::from_json(&text).map_err(|e| MeshError::parse_error(path, e.to_string()))?;
        config.thresholds.validate()?;
        debug!(?config, "Loaded configuration from {:?}", path);
        Ok(config)
    }
}
