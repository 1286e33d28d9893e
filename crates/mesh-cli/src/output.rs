//! Machine-readable output helpers.

use serde::Serialize;

use crate::OutputFormat;

/// Print a serializable value to stdout in the requested format.
///
/// Text output is handled by the caller; this only emits JSON.
pub fn print<T: Serialize>(value: &T, format: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    if let OutputFormat::Json = format {
        match serde_json::to_string_pretty(value) {
            Ok(json) => println!("{}", json),
            Err(e) => tracing::error!("Failed to serialize output: {}", e),
        }
    }
}
