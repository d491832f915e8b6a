// error.rs — Error types for record sources and wire decoding.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecordError {
    /// A record file could not be read.
    #[error("failed to read records from {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A payload was not a valid JSON array of records.
    #[error("decoding error: {0}")]
    Decode(#[from] serde_json::Error),
}
