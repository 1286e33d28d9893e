//! Logging helpers shared by the loading, scoring and report stages.
//!
//! All events go through `tracing`; a binary decides what to show by
//! installing a subscriber, for example with
//! `RUST_LOG=mesh_quality::timing=debug`.
//!
//! # Targets
//!
//! - `mesh_quality::timing`: stage durations
//! - `mesh_quality::io`: surface files read and written
//! - `mesh_quality::report`: report files written
//! - `mesh_quality::mesh_state`: surface size and extent
//! - `mesh_quality::quality`: headline scores

use std::path::Path;
use std::time::Instant;

use tracing::field::Empty;
use tracing::{Span, debug, info, warn};

use crate::config::QualityThresholds;
use crate::error::MeshResult;
use crate::io::MeshFormat;
use crate::summary::QualitySummary;
use crate::types::Mesh;

/// Times one stage of a run and reports the duration when dropped.
///
/// ```
/// use mesh_quality::tracing_ext::OperationTimer;
///
/// let timer = OperationTimer::new("score_faces");
/// assert!(timer.elapsed_ms() >= 0.0);
/// ```
pub struct OperationTimer {
    stage: &'static str,
    started: Instant,
    span: Span,
}

impl OperationTimer {
    pub fn new(stage: &'static str) -> Self {
        let span = tracing::info_span!("stage", name = stage, faces = Empty, vertices = Empty);
        debug!(target: "mesh_quality::timing", stage, "stage started");
        Self {
            stage,
            started: Instant::now(),
            span,
        }
    }

    /// Timer whose span also records the size of the surface being processed.
    pub fn with_context(stage: &'static str, face_count: usize, vertex_count: usize) -> Self {
        let timer = Self::new(stage);
        timer.span.record("faces", face_count);
        timer.span.record("vertices", vertex_count);
        timer
    }

    /// Milliseconds since the timer was created.
    pub fn elapsed_ms(&self) -> f64 {
        self.started.elapsed().as_secs_f64() * 1e3
    }
}

impl Drop for OperationTimer {
    fn drop(&mut self) {
        let _entered = self.span.enter();
        info!(
            target: "mesh_quality::timing",
            stage = self.stage,
            ms = (self.elapsed_ms() * 100.0).round() / 100.0,
            "stage finished"
        );
    }
}

/// Debug-level snapshot of a surface: counts, bounding box and area.
pub fn log_mesh_stats(mesh: &Mesh, context: &str) {
    let Some((lo, hi)) = mesh.bounds() else {
        debug!(target: "mesh_quality::mesh_state", context, "surface has no vertices");
        return;
    };
    let size = hi - lo;
    debug!(
        target: "mesh_quality::mesh_state",
        context,
        vertex_count = mesh.vertex_count(),
        face_count = mesh.face_count(),
        extent = %format!("{:.2} x {:.2} x {:.2}", size.x, size.y, size.z),
        surface_area = mesh.surface_area(),
        "surface state"
    );
}

/// Record the outcome of reading a surface file.
pub fn log_io_operation(path: &Path, format: MeshFormat, result: &MeshResult<Mesh>) {
    match result {
        Ok(mesh) => info!(
            target: "mesh_quality::io",
            path = %path.display(),
            format = format.name(),
            vertices = mesh.vertex_count(),
            faces = mesh.face_count(),
            "surface loaded"
        ),
        Err(err) => warn!(
            target: "mesh_quality::io",
            path = %path.display(),
            format = format.name(),
            code = %err.code(),
            "surface rejected: {err}"
        ),
    }
}

/// Log the headline scores of a summary and the bad-triangle count.
pub fn log_quality_summary(
    summary: &QualitySummary,
    thresholds: &QualityThresholds,
    bad_count: usize,
    face_count: usize,
) {
    for (metric, s) in summary.iter() {
        debug!(
            target: "mesh_quality::quality",
            metric = metric.name(),
            n = s.count,
            median = s.stats.map(|st| st.median),
            "metric summary"
        );
    }

    let (Some(sq), Some(angle)) = (summary.shape_quality.stats, summary.min_angle.stats) else {
        warn!(target: "mesh_quality::quality", face_count, "no finite scores to summarize");
        return;
    };

    info!(
        target: "mesh_quality::quality",
        shape_quality_median = sq.median,
        shape_quality_min = sq.min,
        min_angle_median = angle.median,
        min_angle_min = angle.min,
        bad_count,
        face_count,
        bad_sq_thresh = thresholds.bad_shape_quality,
        bad_angle_thresh = thresholds.bad_min_angle,
        "quality summary"
    );
}
