//! Scan errors.

use std::path::PathBuf;

/// Errors that can occur while discovering and reading scan targets.
///
/// `TargetNotFound` is the only fatal variant: the run aborts before any
/// output. A per-file `Io` failure skips that file and the scan continues.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("Scan target not found: {0}")]
    TargetNotFound(PathBuf),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid glob pattern '{pattern}': {message}")]
    InvalidGlob { pattern: String, message: String },
}
