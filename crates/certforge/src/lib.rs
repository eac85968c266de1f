//! Certforge renders certificates by overlaying recipient-specific data
//! onto a reusable PDF template at positioned coordinates.
//!
//! A [`Template`] pairs a base PDF document with an ordered list of
//! [`Attribute`]s (positioned, typed fields). The [`RenderEngine`] draws
//! one [`Record`] of values onto the base document and returns the
//! finished PDF bytes. Bulk generation lives in the `certforge-batch`
//! crate.

pub mod attribute;
pub mod error;
pub mod pdf;
pub mod record;
pub mod render;
pub mod repository;
pub mod storage;
pub mod template;

// Re-export core types
pub use attribute::{
    Attribute, AttributeKind, Color, FontWeight, TextAlign, is_reserved_id, validate_attribute,
};
pub use error::{
    AttributeError, CertforgeError, DataError, RenderError, Result, StorageError, TemplateError,
};
pub use pdf::PdfDocument;
pub use record::{Record, inject_system_values};
pub use render::{RenderEngine, wrap_text};
pub use repository::{MemoryTemplateRepository, TemplateRepository, delete_template};
pub use storage::{MemoryStorage, StorageGateway, bucket};
pub use template::{Template, TemplateId};

#[cfg(feature = "fs")]
pub use storage::FileStorage;

/// Get the library version
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
