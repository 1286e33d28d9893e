//! Errors raised while loading surfaces, checking them and writing reports.
//!
//! Every [`MeshError`] maps to a numeric [`ErrorCode`] printed as
//! `MESH-<number>`, carries a [`RecoverySuggestion`], and can point at the
//! vertex, face or file it concerns. The enum derives
//! [`miette::Diagnostic`] so binaries can render it with help text.
//!
//! | Range | Meaning |
//! |-------|---------|
//! | 1000s | reading, writing and parsing files |
//! | 2000s | surface content (indices, coordinates, emptiness) |
//! | 4000s | unsupported formats and bad settings |
//!
//! Degenerate triangles are not errors: the geometry kernel scores them
//! with sentinel values.
//!
//! ```
//! use mesh_quality::{ErrorCode, MeshError};
//!
//! let err = MeshError::invalid_vertex_index(7, 163_842, 163_842);
//! assert_eq!(err.code(), ErrorCode::InvalidVertexIndex);
//! assert_eq!(err.code().to_string(), "MESH-2001");
//! ```

use std::fmt;
use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type MeshResult<T> = Result<T, MeshError>;

/// Numeric error codes, displayed as `MESH-<number>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    /// Input file could not be read.
    IoRead = 1001,
    /// Report or surface file could not be written.
    IoWrite = 1002,
    /// File content does not match its format.
    ParseError = 1003,
    /// A face points past the end of the vertex list.
    InvalidVertexIndex = 2001,
    /// A vertex coordinate is NaN or infinite.
    InvalidCoordinate = 2002,
    /// The surface has no vertices or no faces.
    EmptyMesh = 2003,
    /// A face lists the same vertex twice (warning only).
    RepeatedVertex = 2101,
    /// Quad surfaces, or output formats missing from this build.
    UnsupportedFormat = 4001,
    /// Thresholds or report settings are unusable.
    InvalidConfig = 4003,
}

impl ErrorCode {
    /// The numeric part of the code.
    pub fn number(self) -> u16 {
        self as u16
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MESH-{}", self.number())
    }
}

/// What the user can do about an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoverySuggestion {
    /// Regenerate the surface, optionally naming the tool or format to use.
    RegenerateSurface { hint: Option<String> },
    /// Convert the input to one of the readable formats.
    ConvertInput { formats: Vec<String> },
    /// Things worth checking before retrying.
    Check { items: Vec<String> },
    /// Settings to change, as `(flag, accepted values)` pairs.
    ChangeSettings { settings: Vec<(String, String)> },
}

impl fmt::Display for RecoverySuggestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecoverySuggestion::RegenerateSurface { hint: Some(hint) } => {
                write!(f, "Regenerate the surface ({})", hint)
            }
            RecoverySuggestion::RegenerateSurface { hint: None } => {
                f.write_str("Regenerate the surface")
            }
            RecoverySuggestion::ConvertInput { formats } => {
                write!(f, "Convert the input to one of: {}", formats.join(", "))
            }
            RecoverySuggestion::Check { items } => write!(f, "Check {}", items.join("; ")),
            RecoverySuggestion::ChangeSettings { settings } => {
                f.write_str("Change ")?;
                for (i, (flag, accepted)) in settings.iter().enumerate() {
                    if i > 0 {
                        f.write_str("; ")?;
                    }
                    write!(f, "{} to {}", flag, accepted)?;
                }
                Ok(())
            }
        }
    }
}

/// Where in the input an error was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeshLocation {
    /// A vertex, by index.
    Vertex { index: usize },
    /// A face, by index.
    Face { index: usize },
    /// A file, with a byte offset when known.
    File { path: PathBuf, offset: Option<u64> },
}

impl fmt::Display for MeshLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeshLocation::Vertex { index } => write!(f, "vertex #{}", index),
            MeshLocation::Face { index } => write!(f, "face #{}", index),
            MeshLocation::File { path, offset: None } => write!(f, "{}", path.display()),
            MeshLocation::File {
                path,
                offset: Some(offset),
            } => write!(f, "{} at byte {}", path.display(), offset),
        }
    }
}

/// Errors from loading surfaces, checking them and writing reports.
#[derive(Debug, Error, Diagnostic)]
pub enum MeshError {
    #[error("cannot read {}", path.display())]
    #[diagnostic(
        code(mesh_quality::io::read),
        help("Make sure the path points at an existing, readable surface file.")
    )]
    IoRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write {}", path.display())]
    #[diagnostic(
        code(mesh_quality::io::write),
        help("Make sure the output prefix points into a writable directory.")
    )]
    IoWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is malformed: {details}", path.display())]
    #[diagnostic(
        code(mesh_quality::io::parse),
        help("The file is truncated or is not a triangle surface.")
    )]
    ParseError {
        path: PathBuf,
        offset: Option<u64>,
        details: String,
    },

    #[error("unsupported format: {details}")]
    #[diagnostic(
        code(mesh_quality::format),
        help("Readable inputs are FreeSurfer triangle surfaces, OBJ and STL.")
    )]
    UnsupportedFormat { details: String },

    #[error("surface has nothing to score ({details})")]
    #[diagnostic(
        code(mesh_quality::input::empty),
        help("Quality control needs at least one triangle.")
    )]
    EmptyMesh { details: String },

    #[error("face {face_index} uses vertex {vertex_index}, past the last of {vertex_count} vertices")]
    #[diagnostic(
        code(mesh_quality::input::vertex_index),
        help("Face indices are 0-based and must stay below the vertex count.")
    )]
    InvalidVertexIndex {
        face_index: usize,
        vertex_index: u32,
        vertex_count: usize,
    },

    #[error("vertex {vertex_index} has a non-finite {coordinate} coordinate ({value})")]
    #[diagnostic(
        code(mesh_quality::input::coordinate),
        help("NaN or infinite positions usually come from a failed surface reconstruction.")
    )]
    InvalidCoordinate {
        vertex_index: usize,
        coordinate: &'static str,
        value: f64,
    },

    #[error("invalid configuration: {details}")]
    #[diagnostic(
        code(mesh_quality::config),
        help("Thresholds must be finite numbers.")
    )]
    InvalidConfig { details: String },
}

impl MeshError {
    /// Numeric code of this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            MeshError::IoRead { .. } => ErrorCode::IoRead,
            MeshError::IoWrite { .. } => ErrorCode::IoWrite,
            MeshError::ParseError { .. } => ErrorCode::ParseError,
            MeshError::UnsupportedFormat { .. } => ErrorCode::UnsupportedFormat,
            MeshError::EmptyMesh { .. } => ErrorCode::EmptyMesh,
            MeshError::InvalidVertexIndex { .. } => ErrorCode::InvalidVertexIndex,
            MeshError::InvalidCoordinate { .. } => ErrorCode::InvalidCoordinate,
            MeshError::InvalidConfig { .. } => ErrorCode::InvalidConfig,
        }
    }

    /// What the user can try next.
    pub fn recovery_suggestion(&self) -> RecoverySuggestion {
        let check = |items: &[&str]| RecoverySuggestion::Check {
            items: items.iter().map(|s| s.to_string()).collect(),
        };
        match self {
            MeshError::IoRead { .. } => check(&["the input path", "file permissions"]),
            MeshError::IoWrite { .. } => check(&["the output directory", "free disk space"]),
            MeshError::ParseError { .. } | MeshError::InvalidVertexIndex { .. } => {
                RecoverySuggestion::RegenerateSurface {
                    hint: Some("e.g. mris_convert to a triangle surface".into()),
                }
            }
            MeshError::UnsupportedFormat { .. } => RecoverySuggestion::ConvertInput {
                formats: vec!["FreeSurfer surf".into(), "OBJ".into(), "STL".into()],
            },
            MeshError::EmptyMesh { .. } => check(&["that the right surface was passed"]),
            MeshError::InvalidCoordinate { .. } => RecoverySuggestion::RegenerateSurface { hint: None },
            MeshError::InvalidConfig { .. } => RecoverySuggestion::ChangeSettings {
                settings: vec![
                    ("--bad-sq-thresh".into(), "a finite number (default 0.2)".into()),
                    ("--bad-angle-thresh".into(), "a finite number of degrees (default 10)".into()),
                ],
            },
        }
    }

    /// The vertex, face or file the error concerns, when known.
    pub fn location(&self) -> Option<MeshLocation> {
        match self {
            MeshError::InvalidVertexIndex { face_index, .. } => {
                Some(MeshLocation::Face { index: *face_index })
            }
            MeshError::InvalidCoordinate { vertex_index, .. } => {
                Some(MeshLocation::Vertex { index: *vertex_index })
            }
            MeshError::IoRead { path, .. } | MeshError::IoWrite { path, .. } => {
                Some(MeshLocation::File {
                    path: path.clone(),
                    offset: None,
                })
            }
            MeshError::ParseError { path, offset, .. } => Some(MeshLocation::File {
                path: path.clone(),
                offset: *offset,
            }),
            MeshError::UnsupportedFormat { .. }
            | MeshError::EmptyMesh { .. }
            | MeshError::InvalidConfig { .. } => None,
        }
    }

    pub fn io_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MeshError::IoRead {
            path: path.into(),
            source,
        }
    }

    pub fn io_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MeshError::IoWrite {
            path: path.into(),
            source,
        }
    }

    pub fn parse_error(path: impl Into<PathBuf>, details: impl Into<String>) -> Self {
        MeshError::ParseError {
            path: path.into(),
            offset: None,
            details: details.into(),
        }
    }

    /// Parse error at a known byte offset of a binary file.
    pub fn parse_error_at(path: impl Into<PathBuf>, offset: u64, details: impl Into<String>) -> Self {
        MeshError::ParseError {
            path: path.into(),
            offset: Some(offset),
            details: details.into(),
        }
    }

    pub fn invalid_vertex_index(face_index: usize, vertex_index: u32, vertex_count: usize) -> Self {
        MeshError::InvalidVertexIndex {
            face_index,
            vertex_index,
            vertex_count,
        }
    }

    pub fn invalid_coordinate(vertex_index: usize, coordinate: &'static str, value: f64) -> Self {
        MeshError::InvalidCoordinate {
            vertex_index,
            coordinate,
            value,
        }
    }

    pub fn empty_mesh(details: impl Into<String>) -> Self {
        MeshError::EmptyMesh {
            details: details.into(),
        }
    }

    pub fn unsupported_format(details: impl Into<String>) -> Self {
        MeshError::UnsupportedFormat {
            details: details.into(),
        }
    }

    pub fn invalid_config(details: impl Into<String>) -> Self {
        MeshError::InvalidConfig {
            details: details.into(),
        }
    }
}

/// A problem found by [`crate::validate_mesh_data`] in collect mode.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationIssue {
    InvalidVertexIndex {
        face_index: usize,
        vertex_index: u32,
        vertex_count: usize,
    },
    NaNCoordinate {
        vertex_index: usize,
        coordinate: &'static str,
    },
    InfiniteCoordinate {
        vertex_index: usize,
        coordinate: &'static str,
        value: f64,
    },
    /// Tolerated: the face scores zero.
    RepeatedVertex { face_index: usize },
}

/// How serious a [`ValidationIssue`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IssueSeverity {
    /// Scores stay meaningful.
    Warning,
    /// The surface cannot be scored.
    Error,
}

impl ValidationIssue {
    pub fn severity(&self) -> IssueSeverity {
        match self {
            ValidationIssue::RepeatedVertex { .. } => IssueSeverity::Warning,
            _ => IssueSeverity::Error,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            ValidationIssue::InvalidVertexIndex { .. } => ErrorCode::InvalidVertexIndex,
            ValidationIssue::NaNCoordinate { .. } | ValidationIssue::InfiniteCoordinate { .. } => {
                ErrorCode::InvalidCoordinate
            }
            ValidationIssue::RepeatedVertex { .. } => ErrorCode::RepeatedVertex,
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] ", self.code())?;
        match self {
            ValidationIssue::InvalidVertexIndex {
                face_index,
                vertex_index,
                vertex_count,
            } => write!(
                f,
                "face {face_index} uses vertex {vertex_index} of {vertex_count}"
            ),
            ValidationIssue::NaNCoordinate {
                vertex_index,
                coordinate,
            } => write!(f, "vertex {vertex_index}: {coordinate} is NaN"),
            ValidationIssue::InfiniteCoordinate {
                vertex_index,
                coordinate,
                value,
            } => write!(f, "vertex {vertex_index}: {coordinate} is {value}"),
            ValidationIssue::RepeatedVertex { face_index } => {
                write!(f, "face {face_index} repeats a vertex")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_display() {
        assert_eq!(ErrorCode::IoRead.to_string(), "MESH-1001");
        assert_eq!(ErrorCode::RepeatedVertex.number(), 2101);
        assert_eq!(
            MeshError::invalid_config("bad_min_angle is NaN").code().to_string(),
            "MESH-4003"
        );
    }

    #[test]
    fn test_quad_surface_suggests_conversion() {
        let err = MeshError::unsupported_format("lh.orig is a quad surface");
        let RecoverySuggestion::ConvertInput { formats } = err.recovery_suggestion() else {
            panic!("expected a conversion suggestion");
        };
        assert!(formats.iter().any(|f| f.contains("FreeSurfer")));
    }

    #[test]
    fn test_locations() {
        let err = MeshError::invalid_vertex_index(12, 40_962, 40_962);
        assert_eq!(err.location(), Some(MeshLocation::Face { index: 12 }));

        let err = MeshError::invalid_coordinate(3, "z", f64::NAN);
        assert_eq!(err.location().unwrap().to_string(), "vertex #3");

        let err = MeshError::parse_error("surf/lh.white", "truncated");
        assert_eq!(err.location().unwrap().to_string(), "surf/lh.white");

        let err = MeshError::parse_error_at("surf/lh.white", 27, "truncated");
        assert_eq!(err.location().unwrap().to_string(), "surf/lh.white at byte 27");

        assert!(MeshError::empty_mesh("0 faces").location().is_none());
    }

    #[test]
    fn test_messages() {
        let err = MeshError::invalid_vertex_index(12, 40_962, 40_962);
        assert_eq!(
            err.to_string(),
            "face 12 uses vertex 40962, past the last of 40962 vertices"
        );

        let suggestion = MeshError::invalid_config("x").recovery_suggestion().to_string();
        assert!(suggestion.starts_with("Change --bad-sq-thresh to"));
    }

    #[test]
    fn test_issue_severity_and_codes() {
        let warning = ValidationIssue::RepeatedVertex { face_index: 0 };
        assert_eq!(warning.severity(), IssueSeverity::Warning);
        assert_eq!(warning.to_string(), "[MESH-2101] face 0 repeats a vertex");

        let error = ValidationIssue::NaNCoordinate {
            vertex_index: 5,
            coordinate: "y",
        };
        assert_eq!(error.severity(), IssueSeverity::Error);
        assert_eq!(error.code(), ErrorCode::InvalidCoordinate);
        assert!(IssueSeverity::Error > IssueSeverity::Warning);
    }
}
