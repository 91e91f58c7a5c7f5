//! Import error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort an import
///
/// Individual rows that fail to parse are not errors; they are counted in
/// [`ImportResult`](super::ImportResult) instead.
#[derive(Error, Debug)]
pub enum ImportError {
    /// Input file could not be opened
    #[error("Failed to open {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Reading from the input stream failed
    #[error("Read error: {0}")]
    Read(#[from] std::io::Error),

    /// CSV structure error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON document is not an array of objects
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Input format could not be determined or is not supported
    #[error("Unsupported input format: {0}")]
    UnsupportedFormat(String),

    /// A required CSV column is absent
    #[error("Missing column: {0}")]
    MissingColumn(String),
}
