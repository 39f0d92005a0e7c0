//! Error types for dataset serialization.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutputError {
    /// Filesystem trouble while writing or reading a table.
    #[error("dataset io failed: {0}")]
    Io(#[from] std::io::Error),

    /// A row failed to serialize or parse.
    #[error("csv row failed: {0}")]
    Csv(#[from] csv::Error),

    /// The manifest sidecar failed to serialize or parse.
    #[error("manifest failed: {0}")]
    Manifest(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, OutputError>;
