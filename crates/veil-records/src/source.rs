// source.rs — Where the db-server's records come from.
//
// The record source is opaque to the rest of the system: it hands out a fresh
// owned collection per request and never sees who is asking. Redaction
// happens afterwards.

use std::path::{Path, PathBuf};

use crate::error::RecordError;
use crate::patient::{sample_patients, Patient};

/// Produces the record set for one request.
pub trait RecordSource: Send + Sync {
    fn fetch(&self) -> Result<Vec<Patient>, RecordError>;
}

/// The four built-in demo patients.
#[derive(Debug, Clone, Copy, Default)]
pub struct SampleRecordSource;

impl RecordSource for SampleRecordSource {
    fn fetch(&self) -> Result<Vec<Patient>, RecordError> {
        Ok(sample_patients())
    }
}

/// A JSON array of patients on disk, read on every request.
#[derive(Debug, Clone)]
pub struct JsonFileRecordSource {
    path: PathBuf,
}

impl JsonFileRecordSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl RecordSource for JsonFileRecordSource {
    fn fetch(&self) -> Result<Vec<Patient>, RecordError> {
        let bytes = std::fs::read(&self.path).map_err(|source| RecordError::ReadFailed {
            path: self.path.clone(),
            source,
        })?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
