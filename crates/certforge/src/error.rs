//! Error types for the certforge library
//!
//! Errors are organized by domain. Attribute- and data-level problems are
//! validation errors the caller can correct; template and render errors
//! indicate the base document or the drawing pass failed; storage errors
//! come from the blob gateway.

use thiserror::Error;

use crate::attribute::AttributeKind;

/// Main error type for the certforge library
#[derive(Error, Debug)]
pub enum CertforgeError {
    /// Base document problems (malformed bytes, empty page tree)
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    /// Attribute definition problems (reserved ids, page bounds)
    #[error("Attribute error: {0}")]
    Attribute(#[from] AttributeError),

    /// Record validation problems (missing required values)
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    /// Drawing or serialization failures inside the render pass
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// Blob gateway failures
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Base-document errors. These are fatal to the operation that hit them:
/// a template whose bytes do not parse can never produce a certificate.
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Not a valid PDF document: {reason}")]
    InvalidDocument { reason: String },

    #[error("Document has no pages")]
    NoPages,

    #[error("Template not found: {id}")]
    NotFound { id: String },
}

/// Attribute definition errors, raised at attribute-creation time before
/// any render is attempted.
#[derive(Error, Debug)]
pub enum AttributeError {
    #[error("'{id}' is a reserved system attribute id")]
    ReservedId { id: String },

    #[error("System attribute '{id}' must keep kind {expected:?}")]
    LockedKind { id: String, expected: AttributeKind },

    #[error("Only system attributes may be locked: '{id}'")]
    NotSystem { id: String },

    #[error("Page {page} is out of range (template has {page_count} page(s))")]
    PageOutOfRange { page: u32, page_count: u32 },
}

/// Record validation errors
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },
}

/// Engine-level render errors. Attribute-level problems (missing assets,
/// out-of-range pages) never surface here; they are logged and skipped.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("PDF backend error: {reason}")]
    Backend { reason: String },

    #[error("Image decoding failed: {reason}")]
    Image { reason: String },

    #[error("Document serialization failed: {reason}")]
    Serialize { reason: String },
}

/// Blob storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Object not found: {bucket}/{name}")]
    NotFound { bucket: String, name: String },

    #[error("Invalid object name: {name}")]
    InvalidName { name: String },

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Shorthand result type for certforge operations
pub type Result<T> = std::result::Result<T, CertforgeError>;

impl From<lopdf::Error> for CertforgeError {
    fn from(error: lopdf::Error) -> Self {
        CertforgeError::Render(RenderError::Backend {
            reason: error.to_string(),
        })
    }
}

impl From<std::io::Error> for CertforgeError {
    fn from(error: std::io::Error) -> Self {
        CertforgeError::Render(RenderError::Serialize {
            reason: error.to_string(),
        })
    }
}
