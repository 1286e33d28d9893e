//! The quality-control run: load, score, report, save.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use colored::Colorize;
use mesh_quality::tracing_ext::log_quality_summary;
use mesh_quality::{Mesh, MetricSummary, QcConfig, QualitySummary, save_quality_report};
use tracing::info;

use crate::{Cli, OutputFormat, output};

/// Default output prefix: the input path without its last extension, plus
/// `_quality`.
///
/// `subj/surf/lh.white` gives `subj/surf/lh_quality`.
pub fn default_prefix(input: &Path) -> PathBuf {
    let mut prefix = input.with_extension("").into_os_string();
    prefix.push("_quality");
    PathBuf::from(prefix)
}

/// `Some(true)` for `--x`, `Some(false)` for `--no-x`, `None` for neither.
fn toggle(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

/// Merge the optional config file with command-line overrides.
pub fn resolve_config(cli: &Cli) -> Result<QcConfig> {
    let mut config = match &cli.config {
        Some(path) => QcConfig::load(path)
            .with_context(|| format!("Failed to load configuration from {:?}", path))?,
        None => QcConfig::default(),
    };

    if let Some(t) = cli.bad_sq_thresh {
        config.thresholds = config.thresholds.with_shape_quality(t);
    }
    if let Some(degrees) = cli.bad_angle_thresh {
        config.thresholds = config.thresholds.with_min_angle(degrees);
    }
    config.thresholds.validate()?;

    let report = &mut config.report;
    if let Some(on) = toggle(cli.csv, cli.no_csv) {
        report.csv = on;
    }
    if let Some(on) = toggle(cli.npz, cli.no_npz) {
        report.npz = on;
    }
    if let Some(on) = toggle(cli.json, cli.no_json) {
        report.summary_json = on;
    }
    if cli.parquet {
        report.parquet = true;
    }

    Ok(config)
}

fn stats_line(summary: &MetricSummary, decimals: usize, unit: &str) -> String {
    match summary.stats {
        Some(s) => format!(
            "median={:.*}{unit}, mean={:.*}{unit}, min={:.*}{unit}",
            decimals, s.median, decimals, s.mean, decimals, s.min
        ),
        None => "no finite values".dimmed().to_string(),
    }
}

/// Run quality control for the parsed command line.
pub fn run(cli: &Cli) -> Result<()> {
    let input = &cli.input_surf;
    if !input.exists() {
        bail!("input file not found: {}", input.display());
    }

    let config = resolve_config(cli)?;
    let thresholds = config.thresholds;
    let text = cli.format == OutputFormat::Text && !cli.quiet;

    if text {
        println!("{} {}", "Reading".cyan(), input.display());
    }
    let mesh =
        Mesh::load(input).with_context(|| format!("Failed to load mesh from {:?}", input))?;

    info!("Computing quality metrics for {} faces", mesh.face_count());
    let quality = mesh.quality();
    let summary = QualitySummary::from_quality(&quality);
    let bad_count = quality.bad_count(&thresholds);
    let total = quality.len();
    let bad_percent = if total > 0 {
        100.0 * bad_count as f64 / total as f64
    } else {
        0.0
    };
    log_quality_summary(&summary, &thresholds, bad_count, total);

    match cli.format {
        OutputFormat::Json => output::print(&summary, cli.format, cli.quiet),
        OutputFormat::Text => {
            if !cli.quiet {
                println!("{}", "Mesh Quality".bold().underline());
                println!("  {}: {}", "Vertices".cyan(), mesh.vertex_count());
                println!("  {}: {}", "Faces".cyan(), mesh.face_count());
                println!(
                    "  {}: {}",
                    "Shape quality".cyan(),
                    stats_line(&summary.shape_quality, 4, "")
                );
                println!(
                    "  {}: {}",
                    "Min angle".cyan(),
                    stats_line(&summary.min_angle, 2, "°")
                );
                let bad = format!("{}/{} ({:.2}%)", bad_count, total, bad_percent);
                println!(
                    "  {}: {}",
                    "Bad triangles".cyan(),
                    if bad_count == 0 { bad.green() } else { bad.yellow() }
                );
            }
        }
    }

    if cli.summary_only {
        info!("Summary only; no files written");
        return Ok(());
    }

    let prefix = cli
        .output
        .clone()
        .unwrap_or_else(|| default_prefix(input));
    let outcome = save_quality_report(&quality, &summary, &prefix, &config.report, &thresholds)
        .with_context(|| format!("Failed to write report files for prefix {:?}", prefix))?;

    if text {
        for path in &outcome.written {
            println!("  {} {}", "Saved".green(), path.display());
        }
        if config.report.bad_faces && outcome.bad_count == 0 {
            println!("  {}", "No bad faces under current thresholds".dimmed());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["mesh-qc"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    fn write_tetrahedron(dir: &Path) -> PathBuf {
        let path = dir.join("lh.white");
        Mesh::from_arrays(
            &[
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [0.0, 1.0, 0.0],
                [0.0, 0.0, 1.0],
            ],
            &[[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]],
        )
        .save_freesurfer(&path)
        .unwrap();
        path
    }

    #[test]
    fn test_default_prefix() {
        assert_eq!(
            default_prefix(Path::new("subj/surf/lh.white")),
            PathBuf::from("subj/surf/lh_quality")
        );
        assert_eq!(
            default_prefix(Path::new("mesh.obj")),
            PathBuf::from("mesh_quality")
        );
        assert_eq!(
            default_prefix(Path::new("subj/surf/rh.sphere.reg")),
            PathBuf::from("subj/surf/rh.sphere_quality")
        );
    }

    #[test]
    fn test_resolve_defaults() {
        let config = resolve_config(&parse(&["-i", "lh.white"])).unwrap();
        assert_eq!(config, QcConfig::default());
    }

    #[test]
    fn test_resolve_overrides() {
        let config = resolve_config(&parse(&[
            "-i",
            "lh.white",
            "--no-csv",
            "--no-json",
            "--parquet",
            "--bad-sq-thresh",
            "0.5",
        ]))
        .unwrap();
        assert!(!config.report.csv);
        assert!(config.report.npz);
        assert!(!config.report.summary_json);
        assert!(config.report.parquet);
        assert_eq!(config.thresholds.bad_shape_quality, 0.5);
        assert_eq!(config.thresholds.bad_min_angle, 10.0);
    }

    #[test]
    fn test_flags_override_config_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("qc.json");
        std::fs::write(
            &path,
            r#"{"thresholds": {"bad_min_angle": 20.0}, "report": {"csv": false}}"#,
        )
        .unwrap();

        let cli = parse(&["-i", "x", "--config", path.to_str().unwrap(), "--csv"]);
        let config = resolve_config(&cli).unwrap();
        assert_eq!(config.thresholds.bad_min_angle, 20.0);
        assert!(config.report.csv);
    }

    #[test]
    fn test_nan_threshold_rejected() {
        let cli = parse(&["-i", "x", "--bad-angle-thresh", "NaN"]);
        assert!(resolve_config(&cli).is_err());
    }

    #[test]
    fn test_run_writes_reports() {
        let dir = TempDir::new().unwrap();
        let input = write_tetrahedron(dir.path());
        let cli = parse(&["-i", input.to_str().unwrap(), "--quiet"]);

        run(&cli).unwrap();

        assert!(dir.path().join("lh_quality_faces.csv").exists());
        assert!(dir.path().join("lh_quality_faces.npz").exists());
        assert!(dir.path().join("lh_quality_summary.json").exists());
        assert!(!dir.path().join("lh_quality_bad_faces.csv").exists());
    }

    #[test]
    fn test_run_summary_only_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let input = write_tetrahedron(dir.path());
        let cli = parse(&["-i", input.to_str().unwrap(), "--summary-only", "--quiet"]);

        run(&cli).unwrap();

        let entries = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn test_run_strict_thresholds_write_bad_faces() {
        let dir = TempDir::new().unwrap();
        let input = write_tetrahedron(dir.path());
        let prefix = dir.path().join("out").join("qc");
        let cli = parse(&[
            "-i",
            input.to_str().unwrap(),
            "-o",
            prefix.to_str().unwrap(),
            "--no-npz",
            "--bad-sq-thresh",
            "0.9",
            "--quiet",
        ]);

        run(&cli).unwrap();

        let bad = std::fs::read_to_string(dir.path().join("out").join("qc_bad_faces.csv")).unwrap();
        assert_eq!(bad.lines().count(), 4);
        assert!(!dir.path().join("out").join("qc_faces.npz").exists());
    }

    #[test]
    fn test_run_missing_input() {
        let cli = parse(&["-i", "/nonexistent/lh.white", "--quiet"]);
        let err = run(&cli).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
