//! Template handling: a base PDF document plus its ordered attribute list.

use serde::{Deserialize, Serialize};

use crate::attribute::{Attribute, validate_attribute};
use crate::error::{DataError, Result, TemplateError};
use crate::pdf::PdfDocument;
use crate::record::Record;

/// Unique identifier for a template
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TemplateId(pub String);

impl From<String> for TemplateId {
    fn from(s: String) -> Self {
        TemplateId(s)
    }
}

impl From<&str> for TemplateId {
    fn from(s: &str) -> Self {
        TemplateId(s.to_string())
    }
}

impl AsRef<str> for TemplateId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A certificate template.
///
/// Page count and first-page dimensions are extracted from the uploaded
/// document at creation time and never change afterwards. The attribute
/// list is the only mutable part; its order is draw order (later entries
/// are drawn on top).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    /// Unique identifier
    pub id: TemplateId,

    /// Human-readable name
    pub name: String,

    /// Name of the base document in the templates bucket
    pub source_file: String,

    /// Number of pages in the base document
    pub page_count: u32,

    /// First-page width in points
    pub page_width: f32,

    /// First-page height in points
    pub page_height: f32,

    /// Positioned fields, in draw order
    pub attributes: Vec<Attribute>,

    /// Creation timestamp
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: time::OffsetDateTime,

    /// Last update timestamp
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: time::OffsetDateTime,
}

impl Template {
    /// Create a template from uploaded document bytes, extracting page
    /// count and first-page dimensions. `source_file` is the name the
    /// bytes were stored under in the templates bucket.
    pub fn from_document(
        id: impl Into<TemplateId>,
        name: impl Into<String>,
        source_file: impl Into<String>,
        bytes: &[u8],
    ) -> Result<Self> {
        let doc = PdfDocument::load(bytes)?;
        let (page_width, page_height) = doc.page_size(0)?;
        let now = time::OffsetDateTime::now_utc();
        Ok(Template {
            id: id.into(),
            name: name.into(),
            source_file: source_file.into(),
            page_count: doc.page_count() as u32,
            page_width,
            page_height,
            attributes: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Append an attribute after validating it against this template
    pub fn add_attribute(&mut self, attribute: Attribute) -> Result<()> {
        validate_attribute(&attribute, self.page_count)?;
        self.attributes.push(attribute);
        self.touch();
        Ok(())
    }

    /// Remove an attribute by id. Returns true when something was removed.
    pub fn remove_attribute(&mut self, id: &str) -> bool {
        let before = self.attributes.len();
        self.attributes.retain(|a| a.id != id);
        let removed = self.attributes.len() != before;
        if removed {
            self.touch();
        }
        removed
    }

    /// Move an attribute to a new position in the draw order
    pub fn move_attribute(&mut self, id: &str, new_index: usize) -> Result<()> {
        let from = self
            .attributes
            .iter()
            .position(|a| a.id == id)
            .ok_or_else(|| TemplateError::NotFound { id: id.to_string() })?;
        let attr = self.attributes.remove(from);
        let to = new_index.min(self.attributes.len());
        self.attributes.insert(to, attr);
        self.touch();
        Ok(())
    }

    /// Replace the whole attribute list. Every entry is validated before
    /// anything changes, so a bad list leaves the template untouched.
    pub fn replace_attributes(&mut self, attributes: Vec<Attribute>) -> Result<()> {
        for attr in &attributes {
            validate_attribute(attr, self.page_count)?;
        }
        self.attributes = attributes;
        self.touch();
        Ok(())
    }

    /// Check that every required attribute has a non-empty value.
    /// Raised before any render begins; the error names the attribute's
    /// human-readable label.
    pub fn validate_record(&self, record: &Record) -> Result<()> {
        for attr in &self.attributes {
            if !attr.required {
                continue;
            }
            match record.get(&attr.id) {
                Some(value) if !value.trim().is_empty() => {}
                _ => {
                    return Err(DataError::MissingField {
                        field: attr.label.clone(),
                    }
                    .into());
                }
            }
        }
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = time::OffsetDateTime::now_utc();
    }
}
