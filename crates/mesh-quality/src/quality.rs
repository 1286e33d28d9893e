//! Per-triangle quality scores and bad-triangle classification.
//!
//! Scores are normalized so an equilateral triangle scores exactly 1:
//!
//! - **shape quality** `4√3·area / (a² + b² + c²)`, in `[0, 1]`
//! - **radius ratio** `2·r / R`, in `[0, 1]`
//! - **aspect proxy** `1 / shape_quality`, in `[1, ∞]`
//!
//! Both bounded scores are clamped to `[0, 1]`. Rounding can push a
//! near-equilateral score slightly above one.
//!
//! # Example
//!
//! ```
//! use mesh_quality::{Mesh, QualityThresholds, compute_mesh_quality};
//!
//! let h = 3.0f64.sqrt() / 2.0;
//! let mesh = Mesh::from_arrays(
//!     &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.5, h, 0.0], [10.0, 0.0, 0.0]],
//!     &[[0, 1, 2], [0, 3, 2]],
//! );
//!
//! let quality = compute_mesh_quality(&mesh);
//! assert!((quality.records[0].shape_quality - 1.0).abs() < 1e-9);
//!
//! let bad = quality.bad_faces(&QualityThresholds::default());
//! assert_eq!(bad, vec![1]);
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::Mesh;
use crate::config::QualityThresholds;
use crate::geometry::{TriangleGeometry, compute_geometry};

/// Quality record for one triangle.
///
/// Field names double as report column names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FaceQuality {
    pub area: f64,
    pub edge_a: f64,
    pub edge_b: f64,
    pub edge_c: f64,
    pub min_edge: f64,
    pub max_edge: f64,
    #[serde(rename = "angle_A")]
    pub angle_a: f64,
    #[serde(rename = "angle_B")]
    pub angle_b: f64,
    #[serde(rename = "angle_C")]
    pub angle_c: f64,
    pub min_angle: f64,
    pub max_angle: f64,
    pub shape_quality: f64,
    pub radius_ratio: f64,
    pub aspect_proxy: f64,
}

impl FaceQuality {
    /// Derive the quality record from raw triangle geometry.
    pub fn from_geometry(g: &TriangleGeometry) -> Self {
        let [a, b, c] = g.lengths;
        let [angle_a, angle_b, angle_c] = g.angles;
        let sq = shape_quality(g.area, a, b, c);

        Self {
            area: g.area,
            edge_a: a,
            edge_b: b,
            edge_c: c,
            min_edge: a.min(b).min(c),
            max_edge: a.max(b).max(c),
            angle_a,
            angle_b,
            angle_c,
            min_angle: angle_a.min(angle_b).min(angle_c),
            max_angle: angle_a.max(angle_b).max(angle_c),
            shape_quality: sq,
            radius_ratio: radius_ratio(g.inradius, g.circumradius),
            aspect_proxy: aspect_proxy(sq),
        }
    }

    /// Value of one metric column.
    pub fn get(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Area => self.area,
            Metric::EdgeA => self.edge_a,
            Metric::EdgeB => self.edge_b,
            Metric::EdgeC => self.edge_c,
            Metric::MinEdge => self.min_edge,
            Metric::MaxEdge => self.max_edge,
            Metric::AngleA => self.angle_a,
            Metric::AngleB => self.angle_b,
            Metric::AngleC => self.angle_c,
            Metric::MinAngle => self.min_angle,
            Metric::MaxAngle => self.max_angle,
            Metric::ShapeQuality => self.shape_quality,
            Metric::RadiusRatio => self.radius_ratio,
            Metric::AspectProxy => self.aspect_proxy,
        }
    }

    /// Mutable access to one metric column.
    pub fn get_mut(&mut self, metric: Metric) -> &mut f64 {
        match metric {
            Metric::Area => &mut self.area,
            Metric::EdgeA => &mut self.edge_a,
            Metric::EdgeB => &mut self.edge_b,
            Metric::EdgeC => &mut self.edge_c,
            Metric::MinEdge => &mut self.min_edge,
            Metric::MaxEdge => &mut self.max_edge,
            Metric::AngleA => &mut self.angle_a,
            Metric::AngleB => &mut self.angle_b,
            Metric::AngleC => &mut self.angle_c,
            Metric::MinAngle => &mut self.min_angle,
            Metric::MaxAngle => &mut self.max_angle,
            Metric::ShapeQuality => &mut self.shape_quality,
            Metric::RadiusRatio => &mut self.radius_ratio,
            Metric::AspectProxy => &mut self.aspect_proxy,
        }
    }

    /// True when the triangle fails either threshold.
    #[inline]
    pub fn is_bad(&self, thresholds: &QualityThresholds) -> bool {
        self.shape_quality < thresholds.bad_shape_quality
            || self.min_angle < thresholds.bad_min_angle
    }
}

/// Per-face metric columns, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Area,
    EdgeA,
    EdgeB,
    EdgeC,
    MinEdge,
    MaxEdge,
    AngleA,
    AngleB,
    AngleC,
    MinAngle,
    MaxAngle,
    ShapeQuality,
    RadiusRatio,
    AspectProxy,
}

impl Metric {
    /// Every metric column, in per-face table order.
    pub const ALL: [Metric; 14] = [
        Metric::Area,
        Metric::EdgeA,
        Metric::EdgeB,
        Metric::EdgeC,
        Metric::MinEdge,
        Metric::MaxEdge,
        Metric::AngleA,
        Metric::AngleB,
        Metric::AngleC,
        Metric::MinAngle,
        Metric::MaxAngle,
        Metric::ShapeQuality,
        Metric::RadiusRatio,
        Metric::AspectProxy,
    ];

    /// Column name used in reports.
    pub fn name(&self) -> &'static str {
        match self {
            Metric::Area => "area",
            Metric::EdgeA => "edge_a",
            Metric::EdgeB => "edge_b",
            Metric::EdgeC => "edge_c",
            Metric::MinEdge => "min_edge",
            Metric::MaxEdge => "max_edge",
            Metric::AngleA => "angle_A",
            Metric::AngleB => "angle_B",
            Metric::AngleC => "angle_C",
            Metric::MinAngle => "min_angle",
            Metric::MaxAngle => "max_angle",
            Metric::ShapeQuality => "shape_quality",
            Metric::RadiusRatio => "radius_ratio",
            Metric::AspectProxy => "aspect_proxy",
        }
    }

    /// Look a metric up by its column name.
    pub fn from_name(name: &str) -> Option<Metric> {
        Metric::ALL.into_iter().find(|m| m.name() == name)
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// `clamp(4√3·area / (a² + b² + c²), 0, 1)`, zero when all edges are zero.
pub fn shape_quality(area: f64, a: f64, b: f64, c: f64) -> f64 {
    let denom = a * a + b * b + c * c;
    if denom > 0.0 {
        (4.0 * 3.0f64.sqrt() * area / denom).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// `clamp(2r / R, 0, 1)` for a finite positive circumradius, zero otherwise.
pub fn radius_ratio(inradius: f64, circumradius: f64) -> f64 {
    if circumradius.is_finite() && circumradius > 0.0 {
        (2.0 * inradius / circumradius).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// `1 / shape_quality`, infinite for a zero score.
#[inline]
pub fn aspect_proxy(shape_quality: f64) -> f64 {
    if shape_quality > 0.0 {
        1.0 / shape_quality
    } else {
        f64::INFINITY
    }
}

/// Quality records for every face of a mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshQuality {
    /// Vertex indices of each face, in face order.
    pub faces: Vec<[u32; 3]>,
    /// Quality record of each face, in face order.
    pub records: Vec<FaceQuality>,
}

impl MeshQuality {
    /// Pair face indices with their quality records.
    ///
    /// Both vectors must have the same length.
    pub fn new(faces: Vec<[u32; 3]>, records: Vec<FaceQuality>) -> Self {
        debug_assert_eq!(faces.len(), records.len());
        Self { faces, records }
    }

    /// Number of faces.
    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when there are no faces.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// One metric across all faces, in face order.
    pub fn values(&self, metric: Metric) -> Vec<f64> {
        self.records.iter().map(|r| r.get(metric)).collect()
    }

    /// Indices of faces failing either threshold, worst first.
    ///
    /// Sorted by ascending shape quality, then ascending minimum angle.
    /// Ties keep face order.
    pub fn bad_faces(&self, thresholds: &QualityThresholds) -> Vec<usize> {
        let mut bad: Vec<usize> = self
            .records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_bad(thresholds))
            .map(|(i, _)| i)
            .collect();

        bad.sort_by(|&i, &j| {
            let (ri, rj) = (&self.records[i], &self.records[j]);
            ri.shape_quality
                .total_cmp(&rj.shape_quality)
                .then(ri.min_angle.total_cmp(&rj.min_angle))
        });
        bad
    }

    /// Number of faces failing either threshold.
    pub fn bad_count(&self, thresholds: &QualityThresholds) -> usize {
        self.records.iter().filter(|r| r.is_bad(thresholds)).count()
    }
}

/// Score every triangle of the mesh.
pub fn compute_mesh_quality(mesh: &Mesh) -> MeshQuality {
    let records: Vec<FaceQuality> = compute_geometry(mesh)
        .iter()
        .map(FaceQuality::from_geometry)
        .collect();

    debug!(
        target: "mesh_quality::quality",
        faces = records.len(),
        "Computed per-face quality"
    );

    MeshQuality::new(mesh.faces.clone(), records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::triangle_geometry;
    use crate::types::Triangle;
    use approx::assert_relative_eq;
    use nalgebra::Point3;

    fn quality_of(a: [f64; 3], b: [f64; 3], c: [f64; 3]) -> FaceQuality {
        let tri = Triangle::new(Point3::from(a), Point3::from(b), Point3::from(c));
        FaceQuality::from_geometry(&triangle_geometry(&tri))
    }

    fn equilateral() -> FaceQuality {
        let h = 3.0f64.sqrt() / 2.0;
        quality_of([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.5, h, 0.0])
    }

    #[test]
    fn test_equilateral_scores_one() {
        let q = equilateral();
        assert_relative_eq!(q.shape_quality, 1.0, epsilon = 1e-9);
        assert_relative_eq!(q.radius_ratio, 1.0, epsilon = 1e-9);
        assert_relative_eq!(q.aspect_proxy, 1.0, epsilon = 1e-9);
        assert!(q.shape_quality <= 1.0 && q.radius_ratio <= 1.0);
        assert_relative_eq!(q.min_angle, 60.0, epsilon = 1e-9);
        assert_relative_eq!(q.max_angle, 60.0, epsilon = 1e-9);
    }

    #[test]
    fn test_right_isosceles() {
        let q = quality_of([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]);
        // 4√3 · 0.5 / (2 + 1 + 1)
        assert_relative_eq!(q.shape_quality, 3.0f64.sqrt() / 2.0, epsilon = 1e-12);
        // r = 1 - √2/2, R = √2/2
        assert_relative_eq!(q.radius_ratio, 2.0 * 2.0f64.sqrt() - 2.0, epsilon = 1e-12);
        assert_relative_eq!(q.min_edge, 1.0, epsilon = 1e-12);
        assert_relative_eq!(q.max_edge, 2.0f64.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(q.max_angle, 90.0, epsilon = 1e-9);
        assert_relative_eq!(q.min_angle, 45.0, epsilon = 1e-9);
    }

    #[test]
    fn test_degenerate_sentinels() {
        let q = quality_of([0.0, 0.0, 0.0], [0.0, 0.0, 0.0], [1.0, 0.0, 0.0]);
        assert_eq!(q.area, 0.0);
        assert_eq!(q.shape_quality, 0.0);
        assert_eq!(q.radius_ratio, 0.0);
        assert_eq!(q.aspect_proxy, f64::INFINITY);
    }

    #[test]
    fn test_score_guards() {
        assert_eq!(shape_quality(0.0, 0.0, 0.0, 0.0), 0.0);
        assert_eq!(shape_quality(10.0, 1.0, 1.0, 1.0), 1.0);
        assert_eq!(radius_ratio(1.0, f64::INFINITY), 0.0);
        assert_eq!(radius_ratio(1.0, 0.0), 0.0);
        assert_eq!(radius_ratio(0.6, 1.0), 1.0);
        assert_eq!(aspect_proxy(0.0), f64::INFINITY);
        assert_eq!(aspect_proxy(0.5), 2.0);
    }

    #[test]
    fn test_either_threshold_flags() {
        let t = QualityThresholds::default();

        let low_shape = FaceQuality {
            shape_quality: 0.15,
            min_angle: 12.0,
            ..equilateral()
        };
        assert!(low_shape.is_bad(&t));

        let low_angle = FaceQuality {
            shape_quality: 0.5,
            min_angle: 9.0,
            ..equilateral()
        };
        assert!(low_angle.is_bad(&t));

        let fine = FaceQuality {
            shape_quality: 0.2,
            min_angle: 10.0,
            ..equilateral()
        };
        assert!(!fine.is_bad(&t));
    }

    #[test]
    fn test_bad_faces_order() {
        let base = equilateral();
        let records = vec![
            base,
            FaceQuality { shape_quality: 0.1, min_angle: 5.0, ..base },
            FaceQuality { shape_quality: 0.05, min_angle: 20.0, ..base },
            FaceQuality { shape_quality: 0.1, min_angle: 3.0, ..base },
            FaceQuality { shape_quality: 0.9, min_angle: 8.0, ..base },
        ];
        let quality = MeshQuality::new(vec![[0, 1, 2]; 5], records);
        let t = QualityThresholds::default();

        assert_eq!(quality.bad_faces(&t), vec![2, 3, 1, 4]);
        assert_eq!(quality.bad_count(&t), 4);
        assert!(quality.bad_faces(&QualityThresholds::new(0.0, 0.0)).is_empty());
    }

    #[test]
    fn test_metric_names() {
        assert_eq!(Metric::ALL.len(), 14);
        for metric in Metric::ALL {
            assert_eq!(Metric::from_name(metric.name()), Some(metric));
        }
        assert_eq!(Metric::AngleA.to_string(), "angle_A");
        assert_eq!(Metric::from_name("face_id"), None);
    }

    #[test]
    fn test_serde_column_names() {
        let json = serde_json::to_value(equilateral()).unwrap();
        for metric in Metric::ALL {
            assert!(json.get(metric.name()).is_some(), "missing {}", metric);
        }
    }
}
