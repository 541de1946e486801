//! Logging initialization

use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Initialize logging based on debug flag
///
/// Without `debug`, warnings go to stderr so stdout stays clean for graph
/// output. With `debug`, everything down to `debug` is written to a temporary
/// file whose path is returned.
pub fn init_logging(debug: bool) -> Option<PathBuf> {
    if !debug {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            )
            .with_target(false)
            .init();
        return None;
    }

    // Keep the file after the handle is dropped; the OS cleans the temp dir
    let (file, path) = match tempfile::Builder::new()
        .prefix("kube-resource-map-")
        .suffix(".log")
        .tempfile()
        .map_err(|e| e.to_string())
        .and_then(|f| f.keep().map_err(|e| e.to_string()))
    {
        Ok(kept) => kept,
        Err(e) => {
            eprintln!("Failed to create debug log file ({}), logging to stderr", e);
            tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .with_env_filter(EnvFilter::new("debug"))
                .init();
            return None;
        }
    };

    tracing_subscriber::fmt()
        .with_writer(file)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    Some(path)
}
