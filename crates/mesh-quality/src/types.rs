//! The surface being scored and its triangles.

use nalgebra::Point3;

use crate::geometry::{self, TriangleGeometry};

/// Indexed triangle surface.
///
/// Scoring only reads it. Units are whatever the file uses; FreeSurfer
/// surfaces are in millimetres, RAS.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<Point3<f64>>,

    /// 0-based vertex indices, three per triangle.
    pub faces: Vec<[u32; 3]>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::with_capacity(0, 0)
    }

    /// Empty surface with room for the given counts, as readers know them
    /// from file headers.
    pub fn with_capacity(vertex_count: usize, face_count: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertex_count),
            faces: Vec::with_capacity(face_count),
        }
    }

    /// Surface from plain `[x, y, z]` rows and index triples.
    ///
    /// Indices are not checked here; see [`crate::validate_mesh_data`].
    pub fn from_arrays(vertices: &[[f64; 3]], faces: &[[u32; 3]]) -> Self {
        let vertices = vertices.iter().copied().map(Point3::from).collect();
        Self {
            vertices,
            faces: faces.to_vec(),
        }
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// True when there is nothing to score.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.faces.is_empty()
    }

    /// Lowest and highest corner of the axis-aligned box around all
    /// vertices, or `None` without vertices.
    pub fn bounds(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let (first, rest) = self.vertices.split_first()?;
        Some(rest.iter().fold((*first, *first), |(lo, hi), p| {
            (lo.inf(p), hi.sup(p))
        }))
    }

    /// Resolve every face to its corner positions, in face order.
    ///
    /// Panics on an out-of-range index; [`crate::load_mesh`] rejects those.
    pub fn triangles(&self) -> impl Iterator<Item = Triangle> + '_ {
        self.faces.iter().map(|face| {
            let [a, b, c] = face.map(|i| self.vertices[i as usize]);
            Triangle::new(a, b, c)
        })
    }

    /// Corner positions of one face, or `None` when the face or one of
    /// its vertices is missing.
    pub fn triangle(&self, face_idx: usize) -> Option<Triangle> {
        let face = self.faces.get(face_idx)?;
        let corner = |k: usize| self.vertices.get(face[k] as usize).copied();
        Some(Triangle::new(corner(0)?, corner(1)?, corner(2)?))
    }

    /// Sum of all triangle areas, in squared input units.
    pub fn surface_area(&self) -> f64 {
        self.triangles().map(|tri| tri.area()).sum()
    }
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new()
    }
}

/// One face resolved to positions. Corner order matches the face's index order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub v0: Point3<f64>,
    pub v1: Point3<f64>,
    pub v2: Point3<f64>,
}

impl Triangle {
    #[inline]
    pub fn new(v0: Point3<f64>, v1: Point3<f64>, v2: Point3<f64>) -> Self {
        Self { v0, v1, v2 }
    }

    /// Edges, area, angles and radii of this triangle.
    #[inline]
    pub fn geometry(&self) -> TriangleGeometry {
        geometry::triangle_geometry(self)
    }

    /// Half the norm of `e2 x e0`.
    #[inline]
    pub fn area(&self) -> f64 {
        let [e0, _, e2] = geometry::edge_vectors(self);
        geometry::area_from_edges(&e2, &e0)
    }
}
