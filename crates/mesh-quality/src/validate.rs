//! Input checks run before scoring.
//!
//! Scoring needs every face index to resolve and every coordinate to be
//! finite. Faces that repeat a vertex are allowed and only produce a warning.

use tracing::{debug, warn};

use crate::Mesh;
use crate::error::{IssueSeverity, MeshError, MeshResult, ValidationIssue};

/// How [`validate_mesh_data`] reacts to bad input.
#[derive(Debug, Clone)]
pub struct ValidationOptions {
    /// Fail on the first bad index or coordinate instead of collecting.
    pub reject_on_invalid: bool,
    /// Cap on stored issues; counters keep counting past it.
    pub max_issues: usize,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            reject_on_invalid: true,
            max_issues: 100,
        }
    }
}

impl ValidationOptions {
    /// Report every problem instead of failing on the first.
    pub fn collect_all() -> Self {
        Self {
            reject_on_invalid: false,
            ..Default::default()
        }
    }
}

/// Counts and issues gathered by [`validate_mesh_data`].
#[derive(Debug, Clone, Default)]
pub struct DataValidationResult {
    /// Issues found, up to `max_issues`.
    pub issues: Vec<ValidationIssue>,
    /// Face indices outside the vertex list.
    pub invalid_index_count: usize,
    /// NaN coordinates.
    pub nan_count: usize,
    /// Infinite coordinates.
    pub infinity_count: usize,
    /// Faces repeating a vertex index.
    pub repeated_vertex_count: usize,
}

impl DataValidationResult {
    /// No stored issue is an error.
    pub fn is_valid(&self) -> bool {
        !self
            .issues
            .iter()
            .any(|i| i.severity() == IssueSeverity::Error)
    }

    pub fn issue_count(&self) -> usize {
        self.issues.len()
    }
}

/// Check coordinates first, then face indices and repeated vertices.
///
/// With `reject_on_invalid` set, the first problem that would break scoring
/// is returned as an error.
///
/// ```
/// use mesh_quality::{Mesh, ValidationOptions, validate_mesh_data};
///
/// let mesh = Mesh::from_arrays(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]], &[[0, 1, 2]]);
/// assert!(validate_mesh_data(&mesh, &ValidationOptions::default()).is_err());
///
/// let report = validate_mesh_data(&mesh, &ValidationOptions::collect_all()).unwrap();
/// assert!(!report.is_valid());
/// ```
pub fn validate_mesh_data(
    mesh: &Mesh,
    options: &ValidationOptions,
) -> MeshResult<DataValidationResult> {
    let mut result = DataValidationResult::default();
    let record = |result: &mut DataValidationResult, issue: ValidationIssue| {
        if result.issues.len() < options.max_issues {
            result.issues.push(issue);
        }
    };

    let coordinates = mesh.vertices.iter().enumerate().flat_map(|(i, p)| {
        [("x", p.x), ("y", p.y), ("z", p.z)]
            .into_iter()
            .map(move |(axis, value)| (i, axis, value))
    });
    for (vertex_index, coordinate, value) in coordinates.filter(|(_, _, v)| !v.is_finite()) {
        if options.reject_on_invalid {
            return Err(MeshError::invalid_coordinate(vertex_index, coordinate, value));
        }
        let issue = if value.is_nan() {
            result.nan_count += 1;
            ValidationIssue::NaNCoordinate {
                vertex_index,
                coordinate,
            }
        } else {
            result.infinity_count += 1;
            ValidationIssue::InfiniteCoordinate {
                vertex_index,
                coordinate,
                value,
            }
        };
        record(&mut result, issue);
    }

    let vertex_count = mesh.vertex_count();
    for (face_index, &[a, b, c]) in mesh.faces.iter().enumerate() {
        for vertex_index in [a, b, c] {
            if (vertex_index as usize) < vertex_count {
                continue;
            }
            if options.reject_on_invalid {
                return Err(MeshError::invalid_vertex_index(
                    face_index,
                    vertex_index,
                    vertex_count,
                ));
            }
            result.invalid_index_count += 1;
            let issue = ValidationIssue::InvalidVertexIndex {
                face_index,
                vertex_index,
                vertex_count,
            };
            record(&mut result, issue);
        }

        if a == b || b == c || a == c {
            result.repeated_vertex_count += 1;
            record(&mut result, ValidationIssue::RepeatedVertex { face_index });
        }
    }

    if result.repeated_vertex_count > 0 {
        warn!(
            repeated = result.repeated_vertex_count,
            "faces with a repeated vertex will score zero"
        );
    }
    debug!(
        invalid_indices = result.invalid_index_count,
        nan = result.nan_count,
        infinite = result.infinity_count,
        "surface data checked"
    );

    Ok(result)
}
