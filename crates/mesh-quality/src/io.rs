//! Mesh file I/O for FreeSurfer surfaces, OBJ and STL.
//!
//! The reader is chosen from the file extension. `.obj` and `.stl` go to
//! their dedicated loaders; every other name (`lh.white`, `rh.pial`,
//! `lh.inflated`, ...) is read as a FreeSurfer binary triangle surface.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use nalgebra::Point3;
use tracing::{debug, info, warn};

use crate::Mesh;
use crate::error::{MeshError, MeshResult};
use crate::tracing_ext::{OperationTimer, log_io_operation, log_mesh_stats};
use crate::validate::{ValidationOptions, validate_mesh_data};

/// Magic number of a FreeSurfer triangle surface.
pub const TRIANGLE_MAGIC: [u8; 3] = [0xFF, 0xFF, 0xFE];

/// Magic numbers of FreeSurfer quad surfaces (old and new layout).
pub const QUAD_MAGICS: [[u8; 3]; 2] = [[0xFF, 0xFF, 0xFF], [0xFF, 0xFF, 0xFD]];

/// Surface file formats, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshFormat {
    FreeSurfer,
    Obj,
    Stl,
}

impl MeshFormat {
    /// Detect format from file extension, defaulting to FreeSurfer.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
            .as_deref()
        {
            Some("obj") => MeshFormat::Obj,
            Some("stl") => MeshFormat::Stl,
            _ => MeshFormat::FreeSurfer,
        }
    }

    /// Short name used in log events.
    pub fn name(&self) -> &'static str {
        match self {
            MeshFormat::FreeSurfer => "freesurfer",
            MeshFormat::Obj => "obj",
            MeshFormat::Stl => "stl",
        }
    }
}

/// Read a surface in the format its extension names.
///
/// Surfaces without faces or vertices, with out-of-range face indices, or
/// with non-finite coordinates are rejected here, so scoring never sees them.
pub fn load_mesh(path: &Path) -> MeshResult<Mesh> {
    let format = MeshFormat::from_path(path);
    let _timer = OperationTimer::new("load_mesh");

    debug!(target: "mesh_quality::io", path = %path.display(), format = format.name(), "reading surface");

    let result = match format {
        MeshFormat::FreeSurfer => load_freesurfer_surf(path),
        MeshFormat::Obj => load_obj(path),
        MeshFormat::Stl => load_stl(path),
    }
    .and_then(|mesh| {
        if mesh.is_empty() {
            return Err(MeshError::empty_mesh(format!(
                "{} vertices, {} faces",
                mesh.vertex_count(),
                mesh.face_count()
            )));
        }
        validate_mesh_data(&mesh, &ValidationOptions::default())?;
        Ok(mesh)
    });

    log_io_operation(path, format, &result);
    let mesh = result?;
    log_mesh_stats(&mesh, "after load");

    Ok(mesh)
}

/// Big-endian cursor over the bytes of a surface file.
struct SurfReader<'a> {
    path: &'a Path,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> SurfReader<'a> {
    fn new(path: &'a Path, bytes: &'a [u8]) -> Self {
        Self {
            path,
            bytes,
            pos: 0,
        }
    }

    fn take(&mut self, n: usize, what: &str) -> MeshResult<&'a [u8]> {
        let end = self.pos.checked_add(n).filter(|&end| end <= self.bytes.len());
        match end {
            Some(end) => {
                let bytes = self.bytes;
                let slice = &bytes[self.pos..end];
                self.pos = end;
                Ok(slice)
            }
            None => Err(self.error_at(
                self.pos,
                format!(
                    "truncated file: expected {}, file has {} bytes",
                    what,
                    self.bytes.len()
                ),
            )),
        }
    }

    fn read_i32(&mut self, what: &str) -> MeshResult<i32> {
        let b = self.take(4, what)?;
        Ok(i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn read_f32(&mut self, what: &str) -> MeshResult<f32> {
        let b = self.take(4, what)?;
        Ok(f32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Read through the next `\n`, returning the line without it.
    fn read_line(&mut self, what: &str) -> MeshResult<&'a [u8]> {
        let bytes = self.bytes;
        let rest = &bytes[self.pos..];
        match rest.iter().position(|&b| b == b'\n') {
            Some(len) => {
                self.pos += len + 1;
                Ok(&rest[..len])
            }
            None => Err(self.error_at(self.pos, format!("truncated file: missing {}", what))),
        }
    }

    fn read_count(&mut self, what: &str) -> MeshResult<usize> {
        let at = self.pos;
        let n = self.read_i32(what)?;
        usize::try_from(n).map_err(|_| self.error_at(at, format!("negative {}: {}", what, n)))
    }

    fn error_at(&self, offset: usize, details: String) -> MeshError {
        MeshError::parse_error_at(self.path, offset as u64, details)
    }
}

/// Load a FreeSurfer binary triangle surface.
///
/// Layout: 3-byte magic `0xFFFFFE`, a creator line and a blank line,
/// big-endian `i32` vertex and face counts, `f32` coordinate triples, then
/// `i32` index triples. Anything after the face block is ignored.
pub fn load_freesurfer_surf(path: &Path) -> MeshResult<Mesh> {
    let bytes = std::fs::read(path).map_err(|e| MeshError::io_read(path, e))?;
    let mut reader = SurfReader::new(path, &bytes);

    let magic = reader.take(3, "magic number")?;
    if QUAD_MAGICS.iter().any(|q| q == magic) {
        return Err(MeshError::unsupported_format(format!(
            "{} is a FreeSurfer quad surface; only triangle surfaces are supported",
            path.display()
        )));
    }
    if magic != TRIANGLE_MAGIC {
        return Err(reader.error_at(
            0,
            format!(
                "not a FreeSurfer triangle surface (magic {:02X}{:02X}{:02X})",
                magic[0], magic[1], magic[2]
            ),
        ));
    }

    let creator = reader.read_line("creator line")?;
    reader.read_line("blank line after creator")?;
    debug!(
        target: "mesh_quality::io",
        "Surface creator: {}",
        String::from_utf8_lossy(creator).trim()
    );

    let vertex_count = reader.read_count("vertex count")?;
    let face_count = reader.read_count("face count")?;
    debug!(target: "mesh_quality::io", vertex_count, face_count, "Surface header read");

    // Counts come from the file; cap the reservation by what the bytes can hold.
    let remaining = bytes.len().saturating_sub(reader.pos);
    let mut mesh = Mesh::with_capacity(
        vertex_count.min(remaining / 12),
        face_count.min(remaining / 12),
    );

    for _ in 0..vertex_count {
        let x = reader.read_f32("vertex coordinates")?;
        let y = reader.read_f32("vertex coordinates")?;
        let z = reader.read_f32("vertex coordinates")?;
        mesh.vertices
            .push(Point3::new(f64::from(x), f64::from(y), f64::from(z)));
    }

    for face_idx in 0..face_count {
        let mut face = [0u32; 3];
        for slot in &mut face {
            let at = reader.pos;
            let idx = reader.read_i32("face indices")?;
            *slot = u32::try_from(idx).map_err(|_| {
                reader.error_at(at, format!("face {} has negative vertex index {}", face_idx, idx))
            })?;
        }
        mesh.faces.push(face);
    }

    let trailing = bytes.len() - reader.pos;
    if trailing > 0 {
        debug!(target: "mesh_quality::io", "Ignoring {} trailing bytes", trailing);
    }

    Ok(mesh)
}

/// Write a FreeSurfer binary triangle surface readable by [`load_mesh`].
///
/// Coordinates are narrowed to `f32`, as the format requires.
pub fn save_freesurfer_surf(mesh: &Mesh, path: &Path) -> MeshResult<()> {
    let too_large = |what: &str, n: usize| {
        MeshError::unsupported_format(format!(
            "{} {} exceeds the FreeSurfer limit of {}",
            what,
            n,
            i32::MAX
        ))
    };
    let vertex_count =
        i32::try_from(mesh.vertices.len()).map_err(|_| too_large("vertex count", mesh.vertices.len()))?;
    let face_count =
        i32::try_from(mesh.faces.len()).map_err(|_| too_large("face count", mesh.faces.len()))?;
    let mut faces = Vec::with_capacity(mesh.faces.len());
    for face in &mesh.faces {
        let mut out = [0i32; 3];
        for (slot, &idx) in out.iter_mut().zip(face) {
            *slot = i32::try_from(idx).map_err(|_| too_large("vertex index", idx as usize))?;
        }
        faces.push(out);
    }

    let file = File::create(path).map_err(|e| MeshError::io_write(path, e))?;
    let mut writer = BufWriter::new(file);

    let write_err = |e: std::io::Error| MeshError::io_write(path, e);

    writer.write_all(&TRIANGLE_MAGIC).map_err(write_err)?;
    writer
        .write_all(b"created by mesh-qc\n\n")
        .map_err(write_err)?;
    writer
        .write_all(&vertex_count.to_be_bytes())
        .map_err(write_err)?;
    writer.write_all(&face_count.to_be_bytes()).map_err(write_err)?;

    for v in &mesh.vertices {
        for c in [v.x, v.y, v.z] {
            writer
                .write_all(&(c as f32).to_be_bytes())
                .map_err(write_err)?;
        }
    }
    for face in &faces {
        for idx in face {
            writer.write_all(&idx.to_be_bytes()).map_err(write_err)?;
        }
    }

    writer.flush().map_err(write_err)?;

    info!(
        target: "mesh_quality::io",
        path = %path.display(),
        vertices = vertex_count,
        faces = face_count,
        "surface written"
    );

    Ok(())
}

/// Wavefront OBJ. Polygons are fan-triangulated and all models merged.
fn load_obj(path: &Path) -> MeshResult<Mesh> {
    let options = tobj::LoadOptions {
        triangulate: true,
        single_index: true,
        ..Default::default()
    };
    let (models, _) = tobj::load_obj(path, &options).map_err(|e| match e {
        tobj::LoadError::OpenFileFailed => MeshError::io_read(
            path,
            std::io::Error::new(std::io::ErrorKind::NotFound, e.to_string()),
        ),
        _ => MeshError::parse_error(path, e.to_string()),
    })?;

    // Each model indexes its own positions; shift them into one vertex list.
    let mut mesh = Mesh::new();
    for model in &models {
        let base = u32::try_from(mesh.vertex_count()).map_err(|_| {
            MeshError::parse_error(path, "more vertices than 32-bit indices can address")
        })?;
        let positions = &model.mesh.positions;
        mesh.vertices.extend(
            positions
                .chunks_exact(3)
                .map(|p| Point3::new(p[0], p[1], p[2]).cast::<f64>()),
        );
        mesh.faces.extend(
            model
                .mesh
                .indices
                .chunks_exact(3)
                .map(|t| [base + t[0], base + t[1], base + t[2]]),
        );
        debug!(
            target: "mesh_quality::io",
            model = %model.name,
            positions = positions.len() / 3,
            "read OBJ model"
        );
    }

    Ok(mesh)
}

/// Binary or ASCII STL. `stl_io` merges coincident corners into shared
/// vertices; facets that collapse in the process are kept and score zero.
fn load_stl(path: &Path) -> MeshResult<Mesh> {
    let mut reader = File::open(path)
        .map(BufReader::new)
        .map_err(|e| MeshError::io_read(path, e))?;
    let stl = stl_io::read_stl(&mut reader)
        .map_err(|e| MeshError::parse_error(path, e.to_string()))?;

    let vertices = stl
        .vertices
        .iter()
        .map(|v| Point3::from(v.0).cast::<f64>())
        .collect();
    let faces: Vec<[u32; 3]> = stl
        .faces
        .iter()
        .map(|f| f.vertices.map(|i| i as u32))
        .collect();

    let collapsed = faces
        .iter()
        .filter(|&&[a, b, c]| a == b || b == c || a == c)
        .count();
    if collapsed > 0 {
        warn!(target: "mesh_quality::io", collapsed, "STL facets share a corner after vertex merging");
    }

    Ok(Mesh { vertices, faces })
}
