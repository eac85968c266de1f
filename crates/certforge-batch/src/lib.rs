//! Bulk certificate generation on top of `certforge`.
//!
//! Turns a CSV source plus a column-to-attribute mapping into many
//! rendered certificates: rows are settled concurrently in bounded
//! batches with per-row failure isolation, finished documents are
//! persisted through the storage gateway, and one zip archive bundles
//! every success of the run.

pub mod archive;
pub mod error;
pub mod pipeline;
pub mod source;

pub use archive::{ArchiveEntry, ArchiveRef, Archiver};
pub use error::{BatchError, Result};
pub use pipeline::{BatchOptions, BatchPipeline, BatchResult, RowFailure};
pub use source::{TabularSource, parse_csv};
