//! Report files: per-face tables, summary JSON and the bad-faces list.
//!
//! Every file name is the output prefix with a fixed suffix appended:
//!
//! | File | Written when |
//! |------|--------------|
//! | `<prefix>_faces.csv` | `ReportOptions::csv` |
//! | `<prefix>_faces.parquet` | `ReportOptions::parquet` (needs the `parquet` feature) |
//! | `<prefix>_faces.npz` | `ReportOptions::npz` |
//! | `<prefix>_summary.json` | `ReportOptions::summary_json` |
//! | `<prefix>_bad_faces.csv` | `ReportOptions::bad_faces` and at least one face is bad |
//!
//! The per-face columns are `face_id`, `v0`, `v1`, `v2` followed by every
//! [`Metric`] in table order. CSV floats use the shortest representation
//! that parses back to the same value; infinities are written as `inf`.
//!
//! The NPZ bundle is a deflate-compressed zip of `.npy` arrays loadable
//! with `numpy.load`: `face_id` (`<i8`), `F` (`<i4`, M×3) and one `<f8`
//! array per metric.

use std::ffi::OsString;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::{QualityThresholds, ReportOptions};
use crate::error::{MeshError, MeshResult};
use crate::quality::{FaceQuality, MeshQuality, Metric};
use crate::summary::QualitySummary;
use crate::tracing_ext::OperationTimer;

/// Columns of the per-face table, in order.
pub const FACE_COLUMNS: [&str; 18] = [
    "face_id",
    "v0",
    "v1",
    "v2",
    "area",
    "edge_a",
    "edge_b",
    "edge_c",
    "min_edge",
    "max_edge",
    "angle_A",
    "angle_B",
    "angle_C",
    "min_angle",
    "max_angle",
    "shape_quality",
    "radius_ratio",
    "aspect_proxy",
];

/// Files written by [`save_quality_report`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportOutcome {
    /// Paths of every file written, in write order.
    pub written: Vec<PathBuf>,
    /// Number of faces failing the thresholds.
    pub bad_count: usize,
}

/// A per-face table read back from disk.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceTable {
    /// The `face_id` column.
    pub face_ids: Vec<i64>,
    /// Vertex indices and metric columns.
    pub quality: MeshQuality,
}

/// `prefix` with `suffix` appended to the final path component.
///
/// `lh.white_quality` + `_faces.csv` gives `lh.white_quality_faces.csv`.
pub fn prefixed_path(prefix: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(prefix.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

fn write_error(path: &Path, e: impl std::fmt::Display) -> MeshError {
    MeshError::io_write(path, std::io::Error::other(e.to_string()))
}

/// Format a float for CSV output.
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else if value == f64::INFINITY {
        "inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-inf".to_string()
    } else {
        format!("{:?}", value)
    }
}

fn write_rows(
    quality: &MeshQuality,
    rows: impl Iterator<Item = usize>,
    path: &Path,
) -> MeshResult<usize> {
    let file = File::create(path).map_err(|e| MeshError::io_write(path, e))?;
    let mut writer = BufWriter::new(file);
    let err = |e: std::io::Error| MeshError::io_write(path, e);

    writeln!(writer, "{}", FACE_COLUMNS.join(",")).map_err(err)?;

    let mut count = 0;
    for i in rows {
        let [v0, v1, v2] = quality.faces[i];
        write!(writer, "{},{},{},{}", i, v0, v1, v2).map_err(err)?;
        let record = &quality.records[i];
        for metric in Metric::ALL {
            write!(writer, ",{}", format_float(record.get(metric))).map_err(err)?;
        }
        writeln!(writer).map_err(err)?;
        count += 1;
    }

    writer.flush().map_err(err)?;
    Ok(count)
}

/// Write every face to a CSV table.
pub fn write_faces_csv(quality: &MeshQuality, path: &Path) -> MeshResult<()> {
    let rows = write_rows(quality, 0..quality.len(), path)?;
    debug!(target: "mesh_quality::report", rows, "Wrote faces CSV");
    Ok(())
}

/// Write the listed faces, in the given order, to a CSV table.
pub fn write_bad_faces_csv(quality: &MeshQuality, bad: &[usize], path: &Path) -> MeshResult<()> {
    let rows = write_rows(quality, bad.iter().copied(), path)?;
    debug!(target: "mesh_quality::report", rows, "Wrote bad faces CSV");
    Ok(())
}

/// One array of an NPZ bundle, as little-endian bytes.
struct NpyArray {
    name: String,
    descr: &'static str,
    shape: Vec<usize>,
    data: Vec<u8>,
}

impl NpyArray {
    fn float64(name: &str, values: impl Iterator<Item = f64>) -> Self {
        let data: Vec<u8> = values.flat_map(f64::to_le_bytes).collect();
        Self {
            name: name.to_string(),
            descr: "<f8",
            shape: vec![data.len() / 8],
            data,
        }
    }

    fn int64(name: &str, values: impl Iterator<Item = i64>) -> Self {
        let data: Vec<u8> = values.flat_map(i64::to_le_bytes).collect();
        Self {
            name: name.to_string(),
            descr: "<i8",
            shape: vec![data.len() / 8],
            data,
        }
    }

    /// `(n, 3)` int32 array; fails on an index `<i4` cannot hold.
    fn int32_rows(name: &str, rows: &[[u32; 3]]) -> MeshResult<Self> {
        let mut data = Vec::with_capacity(rows.len() * 12);
        for &v in rows.iter().flatten() {
            let v = i32::try_from(v).map_err(|_| {
                MeshError::unsupported_format(format!(
                    "vertex index {} does not fit the int32 `{}` array",
                    v, name
                ))
            })?;
            data.extend_from_slice(&v.to_le_bytes());
        }
        Ok(Self {
            name: name.to_string(),
            descr: "<i4",
            shape: vec![rows.len(), 3],
            data,
        })
    }

    /// Header block of a version 1.0 `.npy` file.
    fn header(&self) -> Vec<u8> {
        let shape = match self.shape.as_slice() {
            [n] => format!("({},)", n),
            dims => format!(
                "({})",
                dims.iter().map(usize::to_string).collect::<Vec<_>>().join(", ")
            ),
        };
        let mut dict = format!(
            "{{'descr': '{}', 'fortran_order': False, 'shape': {}, }}",
            self.descr, shape
        );
        // magic (6) + version (2) + length (2) + dict + '\n' is a multiple of 64
        let unpadded = 10 + dict.len() + 1;
        dict.push_str(&" ".repeat((64 - unpadded % 64) % 64));
        dict.push('\n');

        let mut header = Vec::with_capacity(10 + dict.len());
        header.extend_from_slice(b"\x93NUMPY");
        header.extend_from_slice(&[1, 0]);
        header.extend_from_slice(&(dict.len() as u16).to_le_bytes());
        header.extend_from_slice(dict.as_bytes());
        header
    }
}

/// Write every face to a compressed NPZ bundle.
pub fn write_faces_npz(quality: &MeshQuality, path: &Path) -> MeshResult<()> {
    let n = quality.len();
    let mut arrays = vec![
        NpyArray::int64("face_id", 0..n as i64),
        NpyArray::int32_rows("F", &quality.faces)?,
    ];
    for metric in Metric::ALL {
        arrays.push(NpyArray::float64(
            metric.name(),
            quality.records.iter().map(|r| r.get(metric)),
        ));
    }

    let file = File::create(path).map_err(|e| MeshError::io_write(path, e))?;
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);

    for array in &arrays {
        zip.start_file(format!("{}.npy", array.name), options)
            .map_err(|e| write_error(path, e))?;
        zip.write_all(&array.header())
            .map_err(|e| MeshError::io_write(path, e))?;
        zip.write_all(&array.data)
            .map_err(|e| MeshError::io_write(path, e))?;
    }

    zip.finish().map_err(|e| write_error(path, e))?;
    debug!(target: "mesh_quality::report", arrays = arrays.len(), rows = n, "Wrote faces NPZ");
    Ok(())
}

/// Write every face to a Parquet table.
///
/// Ids are INT64 columns and metrics DOUBLE columns.
#[cfg(feature = "parquet")]
pub fn write_faces_parquet(quality: &MeshQuality, path: &Path) -> MeshResult<()> {
    use parquet::data_type::{DoubleType, Int64Type};
    use parquet::file::properties::WriterProperties;
    use parquet::file::writer::SerializedFileWriter;
    use parquet::schema::parser::parse_message_type;
    use std::sync::Arc;

    let mut message = String::from("message face_quality {\n");
    for name in &FACE_COLUMNS[..4] {
        message.push_str(&format!("  REQUIRED INT64 {};\n", name));
    }
    for name in &FACE_COLUMNS[4..] {
        message.push_str(&format!("  REQUIRED DOUBLE {};\n", name));
    }
    message.push('}');

    let schema = Arc::new(parse_message_type(&message).map_err(|e| write_error(path, e))?);
    let props = Arc::new(WriterProperties::builder().build());
    let file = File::create(path).map_err(|e| MeshError::io_write(path, e))?;
    let mut writer =
        SerializedFileWriter::new(file, schema, props).map_err(|e| write_error(path, e))?;

    let id_columns: [Vec<i64>; 4] = [
        (0..quality.len() as i64).collect(),
        quality.faces.iter().map(|f| i64::from(f[0])).collect(),
        quality.faces.iter().map(|f| i64::from(f[1])).collect(),
        quality.faces.iter().map(|f| i64::from(f[2])).collect(),
    ];

    let mut row_group = writer.next_row_group().map_err(|e| write_error(path, e))?;
    let mut column = 0;
    while let Some(mut col) = row_group.next_column().map_err(|e| write_error(path, e))? {
        if column < id_columns.len() {
            col.typed::<Int64Type>()
                .write_batch(&id_columns[column], None, None)
                .map_err(|e| write_error(path, e))?;
        } else {
            let metric = Metric::ALL[column - id_columns.len()];
            let values = quality.values(metric);
            col.typed::<DoubleType>()
                .write_batch(&values, None, None)
                .map_err(|e| write_error(path, e))?;
        }
        col.close().map_err(|e| write_error(path, e))?;
        column += 1;
    }
    row_group.close().map_err(|e| write_error(path, e))?;
    writer.close().map_err(|e| write_error(path, e))?;

    debug!(target: "mesh_quality::report", rows = quality.len(), "Wrote faces Parquet");
    Ok(())
}

/// Parquet output is unavailable in this build.
#[cfg(not(feature = "parquet"))]
pub fn write_faces_parquet(_quality: &MeshQuality, path: &Path) -> MeshResult<()> {
    Err(MeshError::unsupported_format(format!(
        "cannot write {}: built without the `parquet` feature",
        path.display()
    )))
}

/// Write the summary as pretty JSON.
pub fn write_summary_json(summary: &QualitySummary, path: &Path) -> MeshResult<()> {
    let json = summary.to_json().map_err(|e| write_error(path, e))?;
    std::fs::write(path, json + "\n").map_err(|e| MeshError::io_write(path, e))
}

/// Write the enabled report files for a scored mesh.
///
/// The parent directory of `prefix` is created if missing. When the
/// bad-faces file is enabled but no face fails the thresholds, nothing is
/// written for it and an informational event is logged instead.
pub fn save_quality_report(
    quality: &MeshQuality,
    summary: &QualitySummary,
    prefix: impl AsRef<Path>,
    options: &ReportOptions,
    thresholds: &QualityThresholds,
) -> MeshResult<ReportOutcome> {
    let prefix = prefix.as_ref();
    let _timer = OperationTimer::with_context("save_quality_report", quality.len(), 0);
    let mut outcome = ReportOutcome::default();

    let dir = prefix.parent().filter(|d| !d.as_os_str().is_empty());
    if let (true, Some(dir)) = (options.writes_anything(), dir) {
        std::fs::create_dir_all(dir).map_err(|e| MeshError::io_write(dir, e))?;
    }

    let mut saved = |path: PathBuf| {
        info!(target: "mesh_quality::report", "Saved {}", path.display());
        outcome.written.push(path);
    };

    if options.csv {
        let path = prefixed_path(prefix, "_faces.csv");
        write_faces_csv(quality, &path)?;
        saved(path);
    }
    if options.parquet {
        let path = prefixed_path(prefix, "_faces.parquet");
        write_faces_parquet(quality, &path)?;
        saved(path);
    }
    if options.npz {
        let path = prefixed_path(prefix, "_faces.npz");
        write_faces_npz(quality, &path)?;
        saved(path);
    }
    if options.summary_json {
        let path = prefixed_path(prefix, "_summary.json");
        write_summary_json(summary, &path)?;
        saved(path);
    }

    let bad = quality.bad_faces(thresholds);
    if options.bad_faces {
        if bad.is_empty() {
            info!(target: "mesh_quality::report", "No bad faces under current thresholds");
        } else {
            let path = prefixed_path(prefix, "_bad_faces.csv");
            write_bad_faces_csv(quality, &bad, &path)?;
            info!(
                target: "mesh_quality::report",
                "Saved {} ({} bad faces)",
                path.display(),
                bad.len()
            );
            outcome.written.push(path);
        }
    }
    outcome.bad_count = bad.len();

    Ok(outcome)
}

fn parse_field<T: std::str::FromStr>(path: &Path, line: usize, column: &str, raw: &str) -> MeshResult<T> {
    raw.trim().parse().map_err(|_| {
        MeshError::parse_error(
            path,
            format!("line {}: invalid {} value {:?}", line, column, raw),
        )
    })
}

/// Read a per-face CSV table back.
pub fn read_faces_csv(path: &Path) -> MeshResult<FaceTable> {
    let file = File::open(path).map_err(|e| MeshError::io_read(path, e))?;
    let mut lines = BufReader::new(file).lines();

    let header = lines
        .next()
        .transpose()
        .map_err(|e| MeshError::io_read(path, e))?
        .ok_or_else(|| MeshError::parse_error(path, "empty file"))?;
    let columns: Vec<&str> = header.trim_end().split(',').collect();
    if columns != FACE_COLUMNS {
        return Err(MeshError::parse_error(
            path,
            format!("unexpected header {:?}", header.trim_end()),
        ));
    }

    let mut face_ids = Vec::new();
    let mut faces = Vec::new();
    let mut records = Vec::new();

    for (idx, line) in lines.enumerate() {
        let line_no = idx + 2;
        let line = line.map_err(|e| MeshError::io_read(path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() != FACE_COLUMNS.len() {
            return Err(MeshError::parse_error(
                path,
                format!(
                    "line {}: expected {} fields, found {}",
                    line_no,
                    FACE_COLUMNS.len(),
                    fields.len()
                ),
            ));
        }

        face_ids.push(parse_field(path, line_no, FACE_COLUMNS[0], fields[0])?);
        faces.push([
            parse_field(path, line_no, FACE_COLUMNS[1], fields[1])?,
            parse_field(path, line_no, FACE_COLUMNS[2], fields[2])?,
            parse_field(path, line_no, FACE_COLUMNS[3], fields[3])?,
        ]);
        let mut record = FaceQuality::default();
        for (metric, raw) in Metric::ALL.into_iter().zip(&fields[4..]) {
            *record.get_mut(metric) = parse_field(path, line_no, metric.name(), raw)?;
        }
        records.push(record);
    }

    debug!(target: "mesh_quality::report", rows = records.len(), "Read faces CSV");
    Ok(FaceTable {
        face_ids,
        quality: MeshQuality::new(faces, records),
    })
}

/// A decoded `.npy` array.
struct NpyData {
    descr: String,
    shape: Vec<usize>,
    data: Vec<u8>,
}

fn parse_npy(path: &Path, name: &str, bytes: Vec<u8>) -> MeshResult<NpyData> {
    let bad = |details: String| MeshError::parse_error(path, format!("{}: {}", name, details));

    if bytes.len() < 10 || &bytes[..6] != b"\x93NUMPY" {
        return Err(bad("not an .npy array".into()));
    }
    if bytes[6] != 1 {
        return Err(bad(format!("unsupported .npy version {}.{}", bytes[6], bytes[7])));
    }
    let header_len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
    let data_start = 10 + header_len;
    if bytes.len() < data_start {
        return Err(bad("truncated header".into()));
    }
    let header = String::from_utf8_lossy(&bytes[10..data_start]).into_owned();

    let descr = header
        .split("'descr':")
        .nth(1)
        .and_then(|rest| rest.split('\'').nth(1))
        .ok_or_else(|| bad("missing descr".into()))?
        .to_string();
    if header.contains("'fortran_order': True") {
        return Err(bad("fortran-ordered arrays are not supported".into()));
    }
    let shape_text = header
        .split("'shape':")
        .nth(1)
        .and_then(|rest| rest.split('(').nth(1))
        .and_then(|rest| rest.split(')').next())
        .ok_or_else(|| bad("missing shape".into()))?;
    let shape = shape_text
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<usize>().map_err(|_| bad(format!("invalid shape {:?}", shape_text))))
        .collect::<MeshResult<Vec<_>>>()?;

    let item_size = match descr.as_str() {
        "<f8" | "<i8" => 8,
        "<i4" => 4,
        other => return Err(bad(format!("unsupported dtype {}", other))),
    };
    let expected = shape.iter().product::<usize>() * item_size;
    let data = bytes[data_start..].to_vec();
    if data.len() != expected {
        return Err(bad(format!(
            "expected {} data bytes, found {}",
            expected,
            data.len()
        )));
    }

    Ok(NpyData { descr, shape, data })
}

/// Read a per-face NPZ bundle back.
pub fn read_faces_npz(path: &Path) -> MeshResult<FaceTable> {
    let file = File::open(path).map_err(|e| MeshError::io_read(path, e))?;
    let mut archive =
        zip::ZipArchive::new(file).map_err(|e| MeshError::parse_error(path, e.to_string()))?;

    let mut read_array = |name: &str| -> MeshResult<NpyData> {
        let entry_name = format!("{}.npy", name);
        let mut entry = archive
            .by_name(&entry_name)
            .map_err(|e| MeshError::parse_error(path, format!("{}: {}", entry_name, e)))?;
        let mut bytes = Vec::new();
        entry
            .read_to_end(&mut bytes)
            .map_err(|e| MeshError::io_read(path, e))?;
        parse_npy(path, &entry_name, bytes)
    };

    let ids = read_array("face_id")?;
    if ids.descr != "<i8" {
        return Err(MeshError::parse_error(
            path,
            format!("face_id has dtype {}, expected <i8", ids.descr),
        ));
    }
    let face_ids: Vec<i64> = ids
        .data
        .chunks_exact(8)
        .map(|b| i64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
        .collect();
    let n = face_ids.len();

    let f = read_array("F")?;
    if f.descr != "<i4" || f.shape != [n, 3] {
        return Err(MeshError::parse_error(
            path,
            format!("F has dtype {} and shape {:?}, expected <i4 ({}, 3)", f.descr, f.shape, n),
        ));
    }
    let mut faces = Vec::with_capacity(n);
    for row in f.data.chunks_exact(12) {
        let mut face = [0u32; 3];
        for (slot, b) in face.iter_mut().zip(row.chunks_exact(4)) {
            let idx = i32::from_le_bytes([b[0], b[1], b[2], b[3]]);
            *slot = u32::try_from(idx)
                .map_err(|_| MeshError::parse_error(path, format!("negative vertex index {}", idx)))?;
        }
        faces.push(face);
    }

    let mut records = vec![FaceQuality::default(); n];
    for metric in Metric::ALL {
        let column = read_array(metric.name())?;
        if column.descr != "<f8" || column.shape != [n] {
            return Err(MeshError::parse_error(
                path,
                format!(
                    "{} has dtype {} and shape {:?}, expected <f8 ({},)",
                    metric, column.descr, column.shape, n
                ),
            ));
        }
        for (record, b) in records.iter_mut().zip(column.data.chunks_exact(8)) {
            *record.get_mut(metric) =
                f64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]);
        }
    }

    debug!(target: "mesh_quality::report", rows = n, "Read faces NPZ");
    Ok(FaceTable {
        face_ids,
        quality: MeshQuality::new(faces, records),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Mesh, compute_mesh_quality};
    use tempfile::TempDir;

    /// One equilateral face, one sliver, one degenerate face.
    fn scored() -> MeshQuality {
        let h = 3.0f64.sqrt() / 2.0;
        let mesh = Mesh::from_arrays(
            &[
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [0.5, h, 0.0],
                [10.0, 0.1, 0.0],
                [2.0, 0.0, 0.0],
            ],
            &[[0, 1, 2], [0, 3, 1], [0, 1, 4]],
        );
        compute_mesh_quality(&mesh)
    }

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(0.1), "0.1");
        assert_eq!(format_float(1.0), "1.0");
        assert_eq!(format_float(f64::INFINITY), "inf");
        assert_eq!(format_float(f64::NAN), "nan");
        assert_eq!("inf".parse::<f64>().unwrap(), f64::INFINITY);
    }

    #[test]
    fn test_prefixed_path_keeps_dots() {
        assert_eq!(
            prefixed_path(Path::new("subj/lh.white_quality"), "_faces.csv"),
            PathBuf::from("subj/lh.white_quality_faces.csv")
        );
    }

    #[test]
    fn test_csv_layout() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("t_faces.csv");
        let quality = scored();
        write_faces_csv(&quality, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], FACE_COLUMNS.join(","));
        assert!(lines[1].starts_with("0,0,1,2,"));
        assert!(lines[3].ends_with(",0.0,0.0,inf"));
    }

    #[test]
    fn test_csv_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("t_faces.csv");
        let quality = scored();
        write_faces_csv(&quality, &path).unwrap();

        let table = read_faces_csv(&path).unwrap();
        assert_eq!(table.face_ids, vec![0, 1, 2]);
        assert_eq!(table.quality, quality);
    }

    #[test]
    fn test_npz_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("t_faces.npz");
        let quality = scored();
        write_faces_npz(&quality, &path).unwrap();

        let table = read_faces_npz(&path).unwrap();
        assert_eq!(table.face_ids, vec![0, 1, 2]);
        assert_eq!(table.quality, quality);
    }

    #[test]
    fn test_npy_header_alignment() {
        let array = NpyArray::float64("area", [1.0, 2.0].into_iter());
        let header = array.header();
        assert_eq!(header.len() % 64, 0);
        assert_eq!(header.last(), Some(&b'\n'));
        let text = String::from_utf8_lossy(&header[10..]);
        assert!(text.starts_with("{'descr': '<f8', 'fortran_order': False, 'shape': (2,), }"));

        let f = NpyArray::int32_rows("F", &[[0, 1, 2]]).unwrap();
        assert!(String::from_utf8_lossy(&f.header()).contains("'shape': (1, 3)"));
    }

    #[test]
    fn test_npz_rejects_index_beyond_int32() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("big_faces.npz");
        let quality = MeshQuality::new(
            vec![[0, 1, i32::MAX as u32 + 1]],
            vec![FaceQuality::default()],
        );

        let err = write_faces_npz(&quality, &path).unwrap_err();
        assert_eq!(err.code(), crate::ErrorCode::UnsupportedFormat);
        assert!(err.to_string().contains("2147483648"));
        assert!(!path.exists());
    }

    #[test]
    fn test_save_report_files() {
        let dir = TempDir::new().unwrap();
        let prefix = dir.path().join("out").join("lh.white_quality");
        let quality = scored();
        let summary = QualitySummary::from_quality(&quality);

        let outcome = save_quality_report(
            &quality,
            &summary,
            &prefix,
            &ReportOptions::default(),
            &QualityThresholds::default(),
        )
        .unwrap();

        assert_eq!(outcome.bad_count, 2);
        let names: Vec<String> = outcome
            .written
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec![
                "lh.white_quality_faces.csv",
                "lh.white_quality_faces.npz",
                "lh.white_quality_summary.json",
                "lh.white_quality_bad_faces.csv",
            ]
        );
        for path in &outcome.written {
            assert!(path.exists());
        }

        // Worst first: the degenerate face scores 0 and precedes the sliver.
        let bad = read_faces_csv(&outcome.written[3]).unwrap();
        assert_eq!(bad.face_ids, vec![2, 1]);

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&outcome.written[2]).unwrap()).unwrap();
        assert_eq!(json["shape_quality"]["n"], 3);
        assert_eq!(json["aspect_proxy"]["n"], 2);
    }

    #[test]
    fn test_no_bad_faces_skips_file() {
        let dir = TempDir::new().unwrap();
        let prefix = dir.path().join("eq");
        let h = 3.0f64.sqrt() / 2.0;
        let mesh = Mesh::from_arrays(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.5, h, 0.0]], &[[0, 1, 2]]);
        let quality = compute_mesh_quality(&mesh);
        let summary = QualitySummary::from_quality(&quality);

        let outcome = save_quality_report(
            &quality,
            &summary,
            &prefix,
            &ReportOptions::none().bad_faces(true),
            &QualityThresholds::default(),
        )
        .unwrap();

        assert_eq!(outcome.bad_count, 0);
        assert!(outcome.written.is_empty());
        assert!(!prefixed_path(&prefix, "_bad_faces.csv").exists());
    }

    #[cfg(not(feature = "parquet"))]
    #[test]
    fn test_parquet_needs_feature() {
        let dir = TempDir::new().unwrap();
        let err = write_faces_parquet(&scored(), &dir.path().join("x.parquet")).unwrap_err();
        assert_eq!(err.code(), crate::ErrorCode::UnsupportedFormat);
    }

    #[cfg(feature = "parquet")]
    #[test]
    fn test_parquet_read_back() {
        use parquet::basic::Type as PhysicalType;
        use parquet::file::reader::{FileReader, SerializedFileReader};
        use parquet::record::RowAccessor;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("t_faces.parquet");
        let quality = scored();
        write_faces_parquet(&quality, &path).unwrap();

        let reader = SerializedFileReader::new(File::open(&path).unwrap()).unwrap();
        let meta = reader.metadata().file_metadata();
        assert_eq!(meta.num_rows(), 3);

        let schema = meta.schema_descr();
        assert_eq!(schema.num_columns(), FACE_COLUMNS.len());
        for (i, name) in FACE_COLUMNS.iter().enumerate() {
            let column = schema.column(i);
            assert_eq!(column.name(), *name);
            let expected = if i < 4 {
                PhysicalType::INT64
            } else {
                PhysicalType::DOUBLE
            };
            assert_eq!(column.physical_type(), expected, "column {}", name);
        }

        let rows: Vec<_> = reader
            .get_row_iter(None)
            .unwrap()
            .map(|row| row.unwrap())
            .collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].get_long(0).unwrap(), 1);
        assert_eq!(rows[1].get_long(2).unwrap(), 3);
        for (row, record) in rows.iter().zip(&quality.records) {
            for (k, metric) in Metric::ALL.into_iter().enumerate() {
                let value = row.get_double(4 + k).unwrap();
                let expected = record.get(metric);
                assert!(
                    value == expected || (value.is_nan() && expected.is_nan()),
                    "{}: {} != {}",
                    metric,
                    value,
                    expected
                );
            }
        }
    }

    #[test]
    fn test_read_csv_rejects_wrong_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "a,b,c\n1,2,3\n").unwrap();
        let err = read_faces_csv(&path).unwrap_err();
        assert_eq!(err.code(), crate::ErrorCode::ParseError);
    }
}
