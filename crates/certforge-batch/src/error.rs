//! Error types for bulk generation

use thiserror::Error;

/// Batch-level errors. Per-row problems never surface here; they are
/// captured as [`crate::pipeline::RowFailure`] entries. Only source
/// parsing and archive assembly abort a whole run.
#[derive(Error, Debug)]
pub enum BatchError {
    /// The tabular source itself could not be parsed
    #[error("Tabular source error: {0}")]
    Source(String),

    /// Archive assembly failed
    #[error("Archive error: {0}")]
    Archive(String),

    /// Core library error (template fetch, base document parsing)
    #[error(transparent)]
    Core(#[from] certforge::CertforgeError),

    /// Storage gateway error outside a row task
    #[error("Storage error: {0}")]
    Storage(#[from] certforge::StorageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<csv::Error> for BatchError {
    fn from(error: csv::Error) -> Self {
        BatchError::Source(error.to_string())
    }
}

impl From<zip::result::ZipError> for BatchError {
    fn from(error: zip::result::ZipError) -> Self {
        BatchError::Archive(error.to_string())
    }
}

/// Shorthand result type for batch operations
pub type Result<T> = std::result::Result<T, BatchError>;
