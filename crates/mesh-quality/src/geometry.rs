//! Per-triangle geometry kernel.
//!
//! Edges follow the opposite-vertex convention:
//!
//! - `e0 = v2 - v1`, length `a`, opposite `v0`
//! - `e1 = v0 - v2`, length `b`, opposite `v1`
//! - `e2 = v1 - v0`, length `c`, opposite `v2`
//!
//! Angle `A` sits at `v0` (opposite `a`), and so on. Area uses `e2 × e0`.
//!
//! None of these functions fail. Degenerate triangles resolve to sentinels:
//! zero area, zero inradius, infinite circumradius.

use nalgebra::Vector3;

use crate::Mesh;
use crate::tracing_ext::OperationTimer;
use crate::types::Triangle;

/// Added to law-of-cosines denominators so zero-length edges stay finite.
pub const ANGLE_EPSILON: f64 = 1e-15;

/// Triangles at or below this area have an infinite circumradius.
pub const DEGENERATE_AREA: f64 = 1e-20;

/// Raw geometric quantities for one triangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleGeometry {
    /// Edge vectors `[e0, e1, e2]`.
    pub edges: [Vector3<f64>; 3],
    /// Edge lengths `[a, b, c]`.
    pub lengths: [f64; 3],
    /// Triangle area (>= 0).
    pub area: f64,
    /// Interior angles `[A, B, C]` in degrees.
    pub angles: [f64; 3],
    /// Inscribed circle radius.
    pub inradius: f64,
    /// Circumscribed circle radius, `f64::INFINITY` when degenerate.
    pub circumradius: f64,
}

/// Edge vectors `[e0, e1, e2]` of a triangle.
#[inline]
pub fn edge_vectors(tri: &Triangle) -> [Vector3<f64>; 3] {
    [tri.v2 - tri.v1, tri.v0 - tri.v2, tri.v1 - tri.v0]
}

/// Area from two edge vectors: `0.5 * |e2 × e0|`.
#[inline]
pub fn area_from_edges(e2: &Vector3<f64>, e0: &Vector3<f64>) -> f64 {
    0.5 * e2.cross(e0).norm()
}

/// Interior angles `[A, B, C]` in degrees from edge lengths.
///
/// Cosines are clamped to `[-1, 1]` before `acos` to absorb rounding.
pub fn interior_angles(a: f64, b: f64, c: f64) -> [f64; 3] {
    let cos_a = (b * b + c * c - a * a) / (2.0 * b * c + ANGLE_EPSILON);
    let cos_b = (c * c + a * a - b * b) / (2.0 * c * a + ANGLE_EPSILON);
    let cos_c = (a * a + b * b - c * c) / (2.0 * a * b + ANGLE_EPSILON);

    [cos_a, cos_b, cos_c].map(|cos| cos.clamp(-1.0, 1.0).acos().to_degrees())
}

/// Inradius `area / s`, with `s` the semi-perimeter. Zero when `s` is zero.
#[inline]
pub fn inradius(area: f64, a: f64, b: f64, c: f64) -> f64 {
    let s = 0.5 * (a + b + c);
    if s > 0.0 { area / s } else { 0.0 }
}

/// Circumradius `abc / (4 area)`, infinite for near-zero area.
#[inline]
pub fn circumradius(area: f64, a: f64, b: f64, c: f64) -> f64 {
    if area > DEGENERATE_AREA {
        (a * b * c) / (4.0 * area)
    } else {
        f64::INFINITY
    }
}

/// Compute the full geometry record for one triangle.
pub fn triangle_geometry(tri: &Triangle) -> TriangleGeometry {
    let edges = edge_vectors(tri);
    let [a, b, c] = edges.map(|e| e.norm());
    let area = area_from_edges(&edges[2], &edges[0]);

    TriangleGeometry {
        edges,
        lengths: [a, b, c],
        area,
        angles: interior_angles(a, b, c),
        inradius: inradius(area, a, b, c),
        circumradius: circumradius(area, a, b, c),
    }
}

/// Compute geometry for every face of the mesh, in face order.
///
/// Every face index must be in range; meshes from [`crate::load_mesh`]
/// are validated on load.
pub fn compute_geometry(mesh: &Mesh) -> Vec<TriangleGeometry> {
    let _timer =
        OperationTimer::with_context("compute_geometry", mesh.face_count(), mesh.vertex_count());
    mesh.triangles().map(|tri| tri.geometry()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Point3;

    fn tri(a: [f64; 3], b: [f64; 3], c: [f64; 3]) -> Triangle {
        Triangle::new(Point3::from(a), Point3::from(b), Point3::from(c))
    }

    #[test]
    fn test_edge_convention() {
        let t = tri([0.0, 0.0, 0.0], [3.0, 0.0, 0.0], [0.0, 4.0, 0.0]);
        let [e0, e1, e2] = edge_vectors(&t);
        assert_eq!(e0, Vector3::new(-3.0, 4.0, 0.0));
        assert_eq!(e1, Vector3::new(0.0, -4.0, 0.0));
        assert_eq!(e2, Vector3::new(3.0, 0.0, 0.0));

        let g = triangle_geometry(&t);
        assert_eq!(g.lengths, [5.0, 4.0, 3.0]);
    }

    #[test]
    fn test_right_triangle() {
        let g = triangle_geometry(&tri([0.0, 0.0, 0.0], [3.0, 0.0, 0.0], [0.0, 4.0, 0.0]));
        assert_relative_eq!(g.area, 6.0, epsilon = 1e-12);
        assert_relative_eq!(g.angles[0], 90.0, epsilon = 1e-9);
        assert_relative_eq!(g.angles[1], 4.0f64.atan2(3.0).to_degrees(), epsilon = 1e-9);
        assert_relative_eq!(g.angles[2], 3.0f64.atan2(4.0).to_degrees(), epsilon = 1e-9);
        // r = area / s = 6 / 6, R = hypotenuse / 2
        assert_relative_eq!(g.inradius, 1.0, epsilon = 1e-12);
        assert_relative_eq!(g.circumradius, 2.5, epsilon = 1e-12);
    }

    #[test]
    fn test_equilateral_angles() {
        let h = 3.0f64.sqrt() / 2.0;
        let g = triangle_geometry(&tri([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.5, h, 0.0]));
        for angle in g.angles {
            assert_relative_eq!(angle, 60.0, epsilon = 1e-9);
        }
        assert_relative_eq!(g.circumradius, 2.0 * g.inradius, epsilon = 1e-12);
    }

    #[test]
    fn test_coincident_vertices() {
        let g = triangle_geometry(&tri([1.0, 1.0, 1.0], [1.0, 1.0, 1.0], [2.0, 1.0, 1.0]));
        assert_eq!(g.area, 0.0);
        assert_eq!(g.circumradius, f64::INFINITY);
        assert_eq!(g.inradius, 0.0);
        assert!(g.angles.iter().all(|a| a.is_finite()));
    }

    #[test]
    fn test_all_vertices_coincident() {
        let g = triangle_geometry(&tri([2.0, 2.0, 2.0], [2.0, 2.0, 2.0], [2.0, 2.0, 2.0]));
        assert_eq!(g.lengths, [0.0, 0.0, 0.0]);
        assert_eq!(g.inradius, 0.0);
        assert_eq!(g.circumradius, f64::INFINITY);
        // 0 / eps gives a zero cosine
        for angle in g.angles {
            assert_relative_eq!(angle, 90.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_collinear_angles_clamped() {
        let g = triangle_geometry(&tri([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0]));
        assert!(g.area.abs() < 1e-15);
        assert!(g.angles.iter().all(|a| a.is_finite()));
        assert_relative_eq!(g.angles.iter().sum::<f64>(), 180.0, epsilon = 1e-4);
    }

    #[test]
    fn test_compute_geometry_face_order() {
        let mesh = Mesh::from_arrays(
            &[
                [0.0, 0.0, 0.0],
                [2.0, 0.0, 0.0],
                [0.0, 2.0, 0.0],
                [0.0, 0.0, 1.0],
            ],
            &[[0, 1, 2], [0, 1, 3]],
        );
        let g = compute_geometry(&mesh);
        assert_eq!(g.len(), 2);
        assert_relative_eq!(g[0].area, 2.0, epsilon = 1e-12);
        assert_relative_eq!(g[1].area, 1.0, epsilon = 1e-12);
    }
}
