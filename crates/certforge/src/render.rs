//! The certificate render engine.
//!
//! Produces one finished PDF from one template and one record. The
//! engine is stateless across calls and safe to invoke concurrently;
//! the only I/O it performs is fetching signature assets through the
//! storage gateway.
//!
//! Failure policy: only a malformed base document or a serialization
//! failure abort a render. A missing signature asset, an un-encodable
//! QR payload or an out-of-range page reference degrade to a warning
//! and the single affected field is skipped.

use std::sync::Arc;

use tracing::warn;

use crate::attribute::{Attribute, AttributeKind, Color, TextAlign};
use crate::error::Result;
use crate::pdf::{PdfDocument, RasterFormat, StandardFont};
use crate::record::Record;
use crate::storage::{StorageGateway, bucket};
use crate::template::Template;

const LINE_PITCH: f32 = 1.2;
const DEFAULT_SIGNATURE_WIDTH: f32 = 120.0;
const DEFAULT_SIGNATURE_HEIGHT: f32 = 60.0;
const DEFAULT_QR_SIDE: f32 = 100.0;
const QR_QUIET_MODULES: usize = 4;

/// Renders certificates from templates and records
pub struct RenderEngine {
    assets: Arc<dyn StorageGateway>,
}

impl RenderEngine {
    pub fn new(assets: Arc<dyn StorageGateway>) -> Self {
        Self { assets }
    }

    /// Render one certificate, fetching the base document from the
    /// templates bucket.
    pub async fn render(&self, template: &Template, record: &Record) -> Result<Vec<u8>> {
        let base = self
            .assets
            .get(bucket::TEMPLATES, &template.source_file)
            .await?;
        self.render_document(template, &base, record).await
    }

    /// Render one certificate onto the given base document bytes.
    ///
    /// Required-field validation runs before the document is touched, so
    /// a missing value never produces a half-drawn certificate.
    pub async fn render_document(
        &self,
        template: &Template,
        base: &[u8],
        record: &Record,
    ) -> Result<Vec<u8>> {
        template.validate_record(record)?;

        let mut doc = PdfDocument::load(base)?;

        for attr in &template.attributes {
            let Some(value) = record.get(&attr.id).map(String::as_str) else {
                continue;
            };
            if value.trim().is_empty() {
                continue;
            }

            // page is 1-indexed; a stale reference past the end of the
            // document skips the field, never the whole render
            let page = match (attr.page as usize).checked_sub(1) {
                Some(p) if p < doc.page_count() => p,
                _ => {
                    warn!(
                        attribute = %attr.id,
                        page = attr.page,
                        pages = doc.page_count(),
                        "attribute page out of range, skipping field"
                    );
                    continue;
                }
            };

            match attr.kind {
                AttributeKind::Text | AttributeKind::Date => {
                    draw_text_attribute(&mut doc, attr, page, value);
                }
                AttributeKind::SignatureImage => {
                    self.draw_signature(&mut doc, attr, page, value).await;
                }
                AttributeKind::QrCode => {
                    draw_qr_attribute(&mut doc, attr, page, value);
                }
            }
        }

        doc.save()
    }

    /// The record value of a signature attribute is a filename in the
    /// assets bucket, not inline bytes. Missing or unreadable assets are
    /// non-fatal: the field is skipped.
    async fn draw_signature(&self, doc: &mut PdfDocument, attr: &Attribute, page: usize, value: &str) {
        let bytes = match self.assets.get(bucket::ASSETS, value).await {
            Ok(bytes) => bytes,
            Err(error) => {
                warn!(attribute = %attr.id, asset = %value, %error, "signature asset unavailable, skipping field");
                return;
            }
        };
        let format = RasterFormat::from_name(value);
        match doc.embed_raster_image(&bytes, format) {
            Ok(handle) => {
                doc.draw_image(
                    page,
                    &handle,
                    attr.x,
                    attr.y,
                    attr.width.unwrap_or(DEFAULT_SIGNATURE_WIDTH),
                    attr.height.unwrap_or(DEFAULT_SIGNATURE_HEIGHT),
                );
            }
            Err(error) => {
                warn!(attribute = %attr.id, asset = %value, %error, "signature asset corrupt, skipping field");
            }
        }
    }
}

fn draw_text_attribute(doc: &mut PdfDocument, attr: &Attribute, page: usize, value: &str) {
    let font = StandardFont::resolve(&attr.font_family, attr.font_weight);
    let lines = match attr.max_width {
        Some(max_width) => wrap_text(font, attr.font_size, max_width, value),
        None => vec![value.to_string()],
    };

    for (i, line) in lines.iter().enumerate() {
        // each line is measured and aligned independently
        let width = font.measure(line, attr.font_size);
        let x = match attr.align {
            TextAlign::Left => attr.x,
            TextAlign::Center => attr.x - width / 2.0,
            TextAlign::Right => attr.x - width,
        };
        let y = attr.y - LINE_PITCH * attr.font_size * i as f32;
        doc.draw_text(page, font, attr.font_size, attr.color, x, y, line);
    }
}

/// The record value is the literal QR payload. The code is drawn as
/// vector rectangles: a white quiet-zone background plus the dark
/// modules in the attribute color.
fn draw_qr_attribute(doc: &mut PdfDocument, attr: &Attribute, page: usize, value: &str) {
    let code = match qrcode::QrCode::new(value.as_bytes()) {
        Ok(code) => code,
        Err(error) => {
            warn!(attribute = %attr.id, %error, "QR payload not encodable, skipping field");
            return;
        }
    };
    let modules = code.to_colors();
    let n = code.width();

    let side = attr
        .width
        .unwrap_or(DEFAULT_QR_SIDE)
        .min(attr.height.unwrap_or(DEFAULT_QR_SIDE));
    let cell = side / (n + 2 * QR_QUIET_MODULES) as f32;

    doc.draw_rects(page, Color::WHITE, &[[attr.x, attr.y, side, side]]);

    let mut dark = Vec::new();
    for row in 0..n {
        for col in 0..n {
            if modules[row * n + col] == qrcode::Color::Dark {
                let x = attr.x + (QR_QUIET_MODULES + col) as f32 * cell;
                let y = attr.y + side - (QR_QUIET_MODULES + row + 1) as f32 * cell;
                dark.push([x, y, cell, cell]);
            }
        }
    }
    doc.draw_rects(page, attr.color, &dark);
}

/// Greedy word wrap: words accumulate into a line while the measured
/// width stays within `max_width`. A single word wider than `max_width`
/// occupies its own line unmodified.
pub fn wrap_text(font: StandardFont, size: f32, max_width: f32, text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
            continue;
        }
        let candidate = format!("{current} {word}");
        if font.measure(&candidate, size) <= max_width {
            current = candidate;
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
