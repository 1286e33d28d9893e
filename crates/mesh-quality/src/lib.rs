//! Triangle mesh quality control.
//!
//! This crate scores every triangle of a surface mesh, flags the poorly
//! shaped ones, and writes per-face and summary reports. It is aimed at
//! cortical surfaces produced by FreeSurfer, but any triangle mesh works.
//!
//! # Features
//!
//! - **File I/O**: Load FreeSurfer triangle surfaces, OBJ and STL
//! - **Geometry**: Edge lengths, area, interior angles, inradius, circumradius
//! - **Quality**: Shape quality, radius ratio, aspect proxy, bad-triangle flags
//! - **Summary**: Mean, median and percentiles over finite values
//! - **Reports**: Per-face CSV, NPZ and Parquet tables, summary JSON, bad-faces CSV
//!
//! # Conventions
//!
//! For a face `(v0, v1, v2)` the edges are `e0 = v2 - v1`, `e1 = v0 - v2`
//! and `e2 = v1 - v0`. Edge `a` is opposite `v0`, `b` opposite `v1`, `c`
//! opposite `v2`, and angle `A` sits at `v0`. Angles are in degrees.
//!
//! Degenerate triangles never produce errors. A zero-area face scores zero
//! and has an infinite circumradius and aspect proxy.
//!
//! # Quick Start
//!
//! ```no_run
//! use mesh_quality::{Mesh, QualityThresholds, QualitySummary, ReportOptions};
//!
//! let mesh = Mesh::load("lh.white").unwrap();
//! let quality = mesh.quality();
//! let summary = QualitySummary::from_quality(&quality);
//!
//! let thresholds = QualityThresholds::default();
//! println!("{} bad triangles", quality.bad_count(&thresholds));
//!
//! mesh_quality::save_quality_report(
//!     &quality,
//!     &summary,
//!     "lh.white_quality",
//!     &ReportOptions::default(),
//!     &thresholds,
//! )
//! .unwrap();
//! ```
//!
//! # Logging
//!
//! All operations emit `tracing` events. See [`tracing_ext`] for targets.

mod error;
mod types;

pub mod config;
pub mod geometry;
pub mod io;
pub mod quality;
pub mod report;
pub mod summary;
pub mod tracing_ext;
pub mod validate;

pub use error::{
    ErrorCode, IssueSeverity, MeshError, MeshLocation, MeshResult, RecoverySuggestion,
    ValidationIssue,
};
pub use types::{Mesh, Triangle};

pub use config::{QcConfig, QualityThresholds, ReportOptions};
pub use geometry::{TriangleGeometry, compute_geometry, triangle_geometry};
pub use io::{MeshFormat, load_mesh, save_freesurfer_surf};
pub use quality::{FaceQuality, MeshQuality, Metric, compute_mesh_quality};
pub use report::{FaceTable, ReportOutcome, read_faces_csv, read_faces_npz, save_quality_report};
pub use summary::{MetricSummary, QualitySummary, SummaryStats};
pub use validate::{DataValidationResult, ValidationOptions, validate_mesh_data};

impl Mesh {
    /// Load a mesh from a file, choosing the reader from the extension.
    pub fn load(path: impl AsRef<std::path::Path>) -> MeshResult<Self> {
        io::load_mesh(path.as_ref())
    }

    /// Save the mesh as a FreeSurfer triangle surface.
    pub fn save_freesurfer(&self, path: impl AsRef<std::path::Path>) -> MeshResult<()> {
        io::save_freesurfer_surf(self, path.as_ref())
    }

    /// Score every triangle.
    pub fn quality(&self) -> MeshQuality {
        compute_mesh_quality(self)
    }

    /// Check indices and coordinates, collecting every issue.
    pub fn validate_data(&self) -> DataValidationResult {
        let options = ValidationOptions::collect_all();
        // Never errors with reject_on_invalid unset.
        validate_mesh_data(self, &options).unwrap_or_default()
    }
}
