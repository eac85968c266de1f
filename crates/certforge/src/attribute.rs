//! Positioned field definitions and the reserved system-attribute table.

use serde::{Deserialize, Serialize};

use crate::error::{AttributeError, Result};

/// The kind of value an attribute draws onto the page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeKind {
    #[serde(rename = "text")]
    Text,
    #[serde(rename = "date")]
    Date,
    #[serde(rename = "qrcode")]
    QrCode,
    #[serde(rename = "signatureImage")]
    SignatureImage,
}

/// Font weight for text attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    #[default]
    Normal,
    Bold,
}

/// Horizontal alignment of a text attribute relative to its anchor x
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// RGB fill color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0 };
    pub const WHITE: Color = Color {
        r: 255,
        g: 255,
        b: 255,
    };
}

/// Id of the injected certificate identifier attribute
pub const CERTIFICATE_ID: &str = "certificateId";
/// Id of the recipient name attribute
pub const RECIPIENT_NAME: &str = "recipientName";
/// Id of the injected generation date attribute
pub const GENERATED_DATE: &str = "generatedDate";
/// Id of the verification QR code attribute
pub const QR_CODE: &str = "qrCode";

/// The closed set of system attributes. Their id, label and kind are fixed;
/// callers cannot create user attributes under these ids or change the kind.
pub const SYSTEM_ATTRIBUTES: [(&str, &str, AttributeKind); 4] = [
    (CERTIFICATE_ID, "Certificate ID", AttributeKind::Text),
    (RECIPIENT_NAME, "Recipient Name", AttributeKind::Text),
    (GENERATED_DATE, "Generation Date", AttributeKind::Date),
    (QR_CODE, "QR Code", AttributeKind::QrCode),
];

/// True iff `id` belongs to the fixed system set
pub fn is_reserved_id(id: &str) -> bool {
    SYSTEM_ATTRIBUTES.iter().any(|(sid, _, _)| *sid == id)
}

/// A positioned, typed field placed on a template page.
///
/// Coordinates are document points with the origin at the bottom-left of
/// `page` (1-indexed). List order on the template is draw order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attribute {
    pub id: String,

    /// Human-readable name, used in validation messages
    pub label: String,

    pub kind: AttributeKind,

    /// 1-indexed page the field is drawn on
    pub page: u32,

    pub x: f32,
    pub y: f32,

    #[serde(default = "default_font_family")]
    pub font_family: String,

    #[serde(default)]
    pub font_weight: FontWeight,

    #[serde(default = "default_font_size")]
    pub font_size: f32,

    #[serde(default)]
    pub color: Color,

    #[serde(default)]
    pub align: TextAlign,

    /// When set, text wraps greedily so no line exceeds this width
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_width: Option<f32>,

    /// Drawn width for image kinds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f32>,

    /// Drawn height for image kinds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f32>,

    /// Generation fails for a record missing this value
    #[serde(default)]
    pub required: bool,

    /// True only for system attributes; their id and kind cannot change
    #[serde(default)]
    pub locked: bool,
}

fn default_font_family() -> String {
    "Helvetica".to_string()
}

fn default_font_size() -> f32 {
    14.0
}

impl Attribute {
    /// Create a user attribute. Reserved ids are rejected; use
    /// [`Attribute::system`] to place a system attribute instead.
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        kind: AttributeKind,
        page: u32,
        x: f32,
        y: f32,
    ) -> Result<Self> {
        let id = id.into();
        if is_reserved_id(&id) {
            return Err(AttributeError::ReservedId { id }.into());
        }
        Ok(Attribute {
            id,
            label: label.into(),
            kind,
            page,
            x,
            y,
            font_family: default_font_family(),
            font_weight: FontWeight::default(),
            font_size: default_font_size(),
            color: Color::BLACK,
            align: TextAlign::default(),
            max_width: None,
            width: None,
            height: None,
            required: false,
            locked: false,
        })
    }

    /// Instantiate a system attribute from the fixed table. Returns an
    /// error for ids outside the system set.
    pub fn system(id: &str, page: u32, x: f32, y: f32) -> Result<Self> {
        let (sid, label, kind) = SYSTEM_ATTRIBUTES
            .iter()
            .find(|(sid, _, _)| *sid == id)
            .ok_or_else(|| AttributeError::NotSystem { id: id.to_string() })?;
        Ok(Attribute {
            id: (*sid).to_string(),
            label: (*label).to_string(),
            kind: *kind,
            page,
            x,
            y,
            font_family: default_font_family(),
            font_weight: FontWeight::default(),
            font_size: default_font_size(),
            color: Color::BLACK,
            align: TextAlign::default(),
            max_width: None,
            width: None,
            height: None,
            required: false,
            locked: true,
        })
    }

    pub fn with_style(
        mut self,
        font_family: impl Into<String>,
        font_weight: FontWeight,
        font_size: f32,
        color: Color,
        align: TextAlign,
    ) -> Self {
        self.font_family = font_family.into();
        self.font_weight = font_weight;
        self.font_size = font_size;
        self.color = color;
        self.align = align;
        self
    }

    pub fn with_max_width(mut self, max_width: f32) -> Self {
        self.max_width = Some(max_width);
        self
    }

    pub fn with_box(mut self, width: f32, height: f32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn require(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Validate an attribute against a template before it is saved.
///
/// Checks the reserved-id invariant (user attributes cannot claim system
/// ids, system attributes cannot be retyped or unlocked) and the page
/// bounds `1 <= page <= page_count`.
pub fn validate_attribute(attr: &Attribute, page_count: u32) -> Result<()> {
    match SYSTEM_ATTRIBUTES.iter().find(|(sid, _, _)| *sid == attr.id) {
        Some((_, _, kind)) => {
            if attr.kind != *kind {
                return Err(AttributeError::LockedKind {
                    id: attr.id.clone(),
                    expected: *kind,
                }
                .into());
            }
            if !attr.locked {
                return Err(AttributeError::ReservedId {
                    id: attr.id.clone(),
                }
                .into());
            }
        }
        None => {
            if attr.locked {
                return Err(AttributeError::NotSystem {
                    id: attr.id.clone(),
                }
                .into());
            }
        }
    }

    if attr.page < 1 || attr.page > page_count {
        return Err(AttributeError::PageOutOfRange {
            page: attr.page,
            page_count,
        }
        .into());
    }

    Ok(())
}
