//! mesh-qc: Command-line quality control for triangle surface meshes.
//!
//! Scores every triangle of a surface, prints a short quality report and
//! writes per-face tables, a summary and the list of bad triangles next to
//! the input.
//!
//! # Logging
//!
//! Set the `RUST_LOG` environment variable to control log output:
//! - `RUST_LOG=mesh_quality=info` - Basic operation logging
//! - `RUST_LOG=mesh_quality=debug` - Detailed progress logging
//! - `RUST_LOG=mesh_quality::timing=debug` - Performance timing
//! - `RUST_LOG=debug` - All debug output
//!
//! # Example
//!
//! ```bash
//! # Score a white-matter surface with default thresholds
//! mesh-qc -i subj/surf/lh.white
//!
//! # Stricter thresholds, summary only, JSON on stdout
//! mesh-qc -i lh.pial --bad-sq-thresh 0.3 --bad-angle-thresh 15 --summary-only --format json
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use colored::Colorize;
use mesh_quality::MeshError;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod output;
mod qc;

/// mesh-qc - Triangle quality control for surface meshes.
///
/// Reads a FreeSurfer surface (or OBJ/STL), scores every triangle and
/// reports the poorly shaped ones.
#[derive(Parser, Debug)]
#[command(name = "mesh-qc")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Input surface (FreeSurfer triangle surface, .obj or .stl)
    #[arg(short = 'i', long = "input-surf")]
    pub input_surf: PathBuf,

    /// Output prefix [default: input path without its extension, plus _quality]
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// JSON file with thresholds and report options; flags override it
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Write the per-face CSV table
    #[arg(long, overrides_with = "no_csv")]
    pub csv: bool,

    /// Skip the per-face CSV table
    #[arg(long, overrides_with = "csv")]
    pub no_csv: bool,

    /// Write the per-face NPZ bundle
    #[arg(long, overrides_with = "no_npz")]
    pub npz: bool,

    /// Skip the per-face NPZ bundle
    #[arg(long, overrides_with = "npz")]
    pub no_npz: bool,

    /// Write the summary JSON
    #[arg(long, overrides_with = "no_json")]
    pub json: bool,

    /// Skip the summary JSON
    #[arg(long, overrides_with = "json")]
    pub no_json: bool,

    /// Also write the per-face Parquet table
    #[arg(long)]
    pub parquet: bool,

    /// Flag triangles with shape quality below this value [default: 0.2]
    #[arg(long)]
    pub bad_sq_thresh: Option<f64>,

    /// Flag triangles with a minimum angle below this many degrees [default: 10]
    #[arg(long)]
    pub bad_angle_thresh: Option<f64>,

    /// Print the summary without writing any file
    #[arg(long)]
    pub summary_only: bool,

    /// Output format for results
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Suppress all non-error output
    #[arg(long, short, global = true)]
    pub quiet: bool,

    /// Increase output verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for scripting
    Json,
}

/// Initialize the tracing subscriber based on verbosity level.
fn init_tracing(verbose: u8, quiet: bool) {
    if quiet {
        return;
    }

    // RUST_LOG wins over -v flags
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match verbose {
            0 => "warn",
            1 => "mesh_quality=info,mesh_qc=info",
            2 => "mesh_quality=debug,mesh_qc=debug",
            _ => "trace",
        };
        EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .with(filter)
        .init();
}

/// Error report for stderr: the top-level message, its causes, then the
/// code, suggestion and location of a [`MeshError`] when one is in the chain.
fn render_error(e: &anyhow::Error) -> String {
    let mut out = format!("{}: {}\n", "Error".red().bold(), e);
    for cause in e.chain().skip(1) {
        out.push_str(&format!("  {}: {}\n", "Caused by".yellow(), cause));
    }
    if let Some(mesh_err) = e.downcast_ref::<MeshError>() {
        out.push_str(&format!("  {}: {}\n", "Code".cyan(), mesh_err.code()));
        out.push_str(&format!(
            "  {}: {}\n",
            "Suggestion".green(),
            mesh_err.recovery_suggestion()
        ));
        if let Some(location) = mesh_err.location() {
            out.push_str(&format!("  {}: {}\n", "Location".yellow(), location));
        }
    }
    out
}

fn main() -> Result<()> {
    #[cfg(debug_assertions)]
    miette::set_panic_hook();

    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.quiet);

    let result = qc::run(&cli);

    if let Err(e) = &result {
        if !cli.quiet {
            eprint!("{}", render_error(e));
        }
        std::process::exit(1);
    }

    Ok(())
}
