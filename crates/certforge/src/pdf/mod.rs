//! PDF document backend built on `lopdf`.
//!
//! Wraps a loaded document with the overlay primitives the render engine
//! needs: embed a standard font, draw text, draw an image, fill
//! rectangles, query page geometry, serialize. Overlays are buffered as
//! content operations per page and flushed on [`PdfDocument::save`]: the
//! original page content is wrapped in `q`/`Q` so its graphics state
//! cannot leak into the stamped operators, and the overlay is appended
//! as a separate content stream.

mod fonts;

pub use fonts::StandardFont;

use std::collections::BTreeMap;
use std::io::{Cursor, Write};

use flate2::Compression;
use flate2::write::ZlibEncoder;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat, dictionary};

use crate::attribute::Color;
use crate::error::{RenderError, Result, TemplateError};

/// Raster image formats accepted for signature assets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterFormat {
    Png,
    Jpeg,
}

impl RasterFormat {
    /// Detect the format from a filename extension; anything that is not
    /// `.png` is treated as JPEG.
    pub fn from_name(name: &str) -> RasterFormat {
        if name.to_ascii_lowercase().ends_with(".png") {
            RasterFormat::Png
        } else {
            RasterFormat::Jpeg
        }
    }
}

/// Handle to an image XObject embedded in the document
#[derive(Debug, Clone, Copy)]
pub struct ImageHandle {
    id: ObjectId,
}

/// A loaded PDF document with buffered overlay operations
#[derive(Debug)]
pub struct PdfDocument {
    doc: Document,
    pages: Vec<ObjectId>,
    overlays: BTreeMap<usize, Content>,
    fonts: BTreeMap<StandardFont, (String, ObjectId)>,
    page_fonts: BTreeMap<usize, Vec<(String, ObjectId)>>,
    page_xobjects: BTreeMap<usize, Vec<(String, ObjectId)>>,
    next_image: usize,
}

impl PdfDocument {
    /// Parse a document from raw bytes. Malformed bytes and documents
    /// without pages are fatal input errors.
    pub fn load(bytes: &[u8]) -> Result<Self> {
        let doc = Document::load_mem(bytes).map_err(|e| TemplateError::InvalidDocument {
            reason: e.to_string(),
        })?;
        let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
        if pages.is_empty() {
            return Err(TemplateError::NoPages.into());
        }
        Ok(PdfDocument {
            doc,
            pages,
            overlays: BTreeMap::new(),
            fonts: BTreeMap::new(),
            page_fonts: BTreeMap::new(),
            page_xobjects: BTreeMap::new(),
            next_image: 0,
        })
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Width and height of a page (0-indexed), resolving the MediaBox
    /// through the page tree. Pages without any MediaBox fall back to
    /// US Letter.
    pub fn page_size(&self, page_index: usize) -> Result<(f32, f32)> {
        let page_id = *self.pages.get(page_index).ok_or(TemplateError::NoPages)?;
        let mut dict = self.doc.get_dictionary(page_id)?;
        for _ in 0..16 {
            if let Ok(obj) = dict.get(b"MediaBox") {
                if let Some(bx) = media_box(&self.doc, obj) {
                    return Ok((bx[2] - bx[0], bx[3] - bx[1]));
                }
            }
            match dict.get(b"Parent") {
                Ok(Object::Reference(id)) => dict = self.doc.get_dictionary(*id)?,
                _ => break,
            }
        }
        Ok((612.0, 792.0))
    }

    /// Queue a single line of text at `(x, y)` on a page (0-indexed)
    pub fn draw_text(
        &mut self,
        page_index: usize,
        font: StandardFont,
        size: f32,
        color: Color,
        x: f32,
        y: f32,
        text: &str,
    ) {
        if page_index >= self.pages.len() {
            return;
        }
        let name = self.ensure_font(page_index, font);
        let ops = &mut self.overlay(page_index).operations;
        ops.push(Operation::new("BT", vec![]));
        ops.push(Operation::new(
            "Tf",
            vec![Object::Name(name.into_bytes()), size.into()],
        ));
        ops.push(Operation::new("rg", rgb_operands(color)));
        ops.push(Operation::new("Td", vec![x.into(), y.into()]));
        ops.push(Operation::new(
            "Tj",
            vec![Object::String(to_win_ansi(text), StringFormat::Literal)],
        ));
        ops.push(Operation::new("ET", vec![]));
    }

    /// Queue filled rectangles (`[x, y, w, h]`) in one color
    pub fn draw_rects(&mut self, page_index: usize, color: Color, rects: &[[f32; 4]]) {
        if page_index >= self.pages.len() || rects.is_empty() {
            return;
        }
        let ops = &mut self.overlay(page_index).operations;
        ops.push(Operation::new("q", vec![]));
        ops.push(Operation::new("rg", rgb_operands(color)));
        for r in rects {
            ops.push(Operation::new(
                "re",
                vec![r[0].into(), r[1].into(), r[2].into(), r[3].into()],
            ));
        }
        ops.push(Operation::new("f", vec![]));
        ops.push(Operation::new("Q", vec![]));
    }

    /// Decode a raster image and embed it as an RGB XObject
    pub fn embed_raster_image(&mut self, bytes: &[u8], format: RasterFormat) -> Result<ImageHandle> {
        let format = match format {
            RasterFormat::Png => image::ImageFormat::Png,
            RasterFormat::Jpeg => image::ImageFormat::Jpeg,
        };
        let decoded = image::load_from_memory_with_format(bytes, format).map_err(|e| {
            RenderError::Image {
                reason: e.to_string(),
            }
        })?;
        let rgb = decoded.to_rgb8();
        let (width, height) = rgb.dimensions();

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(6));
        encoder.write_all(rgb.as_raw())?;
        let data = encoder.finish()?;

        let stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "Filter" => "FlateDecode",
            },
            data,
        );
        let id = self.doc.add_object(stream);
        Ok(ImageHandle { id })
    }

    /// Queue an embedded image at `(x, y)` scaled to `w` by `h`
    pub fn draw_image(
        &mut self,
        page_index: usize,
        image: &ImageHandle,
        x: f32,
        y: f32,
        w: f32,
        h: f32,
    ) {
        if page_index >= self.pages.len() {
            return;
        }
        let name = self.ensure_xobject(page_index, image.id);
        let ops = &mut self.overlay(page_index).operations;
        ops.push(Operation::new("q", vec![]));
        ops.push(Operation::new(
            "cm",
            vec![
                w.into(),
                0.into(),
                0.into(),
                h.into(),
                x.into(),
                y.into(),
            ],
        ));
        ops.push(Operation::new("Do", vec![Object::Name(name.into_bytes())]));
        ops.push(Operation::new("Q", vec![]));
    }

    /// Flush all queued overlays and serialize the document to bytes
    pub fn save(mut self) -> Result<Vec<u8>> {
        let overlays = std::mem::take(&mut self.overlays);
        for (page_index, content) in overlays {
            let page_id = self.pages[page_index];
            self.append_overlay(page_id, &content)?;

            let fonts = self.page_fonts.remove(&page_index).unwrap_or_default();
            let xobjects = self.page_xobjects.remove(&page_index).unwrap_or_default();
            self.merge_page_resources(page_id, &fonts, &xobjects)?;
        }

        let mut buffer = Vec::new();
        self.doc
            .save_to(&mut Cursor::new(&mut buffer))
            .map_err(|e| RenderError::Serialize {
                reason: e.to_string(),
            })?;
        Ok(buffer)
    }

    fn overlay(&mut self, page_index: usize) -> &mut Content {
        self.overlays.entry(page_index).or_insert_with(|| Content {
            operations: Vec::new(),
        })
    }

    fn ensure_font(&mut self, page_index: usize, font: StandardFont) -> String {
        if !self.fonts.contains_key(&font) {
            let name = format!("CF{}", self.fonts.len() + 1);
            let id = self.doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => font.base_font(),
                "Encoding" => "WinAnsiEncoding",
            });
            self.fonts.insert(font, (name, id));
        }
        let (name, id) = self.fonts[&font].clone();
        let registered = self.page_fonts.entry(page_index).or_default();
        if !registered.iter().any(|(n, _)| *n == name) {
            registered.push((name.clone(), id));
        }
        name
    }

    fn ensure_xobject(&mut self, page_index: usize, id: ObjectId) -> String {
        let registered = self.page_xobjects.entry(page_index).or_default();
        if let Some((name, _)) = registered.iter().find(|(_, oid)| *oid == id) {
            return name.clone();
        }
        self.next_image += 1;
        let name = format!("CIm{}", self.next_image);
        registered.push((name.clone(), id));
        name
    }

    /// Wrap the existing page content in `q`/`Q` and append the overlay
    /// as a fresh stream at the end of the Contents array.
    fn append_overlay(&mut self, page_id: ObjectId, content: &Content) -> Result<()> {
        let encoded = content.encode()?;

        let existing: Vec<Object> = {
            let page = self.doc.get_dictionary(page_id)?;
            match page.get(b"Contents") {
                Ok(Object::Reference(id)) => match self.doc.get_object(*id) {
                    Ok(Object::Array(items)) => items.clone(),
                    _ => vec![Object::Reference(*id)],
                },
                Ok(Object::Array(items)) => items.clone(),
                _ => Vec::new(),
            }
        };

        let prefix_id = self
            .doc
            .add_object(Stream::new(dictionary! {}, b"q\n".to_vec()));
        let mut tail = b"Q\n".to_vec();
        tail.extend_from_slice(&encoded);
        let overlay_id = self.doc.add_object(Stream::new(dictionary! {}, tail));

        let mut contents = Vec::with_capacity(existing.len() + 2);
        contents.push(Object::Reference(prefix_id));
        contents.extend(existing);
        contents.push(Object::Reference(overlay_id));

        let page = self.doc.get_object_mut(page_id)?.as_dict_mut()?;
        page.set("Contents", contents);
        Ok(())
    }

    /// Materialize the page's resources (resolving references and page
    /// tree inheritance) as a direct dictionary with our font and image
    /// entries merged in.
    fn merge_page_resources(
        &mut self,
        page_id: ObjectId,
        fonts: &[(String, ObjectId)],
        xobjects: &[(String, ObjectId)],
    ) -> Result<()> {
        let mut resources = inherited_resources(&self.doc, page_id)?;

        if !fonts.is_empty() {
            let mut font_dict = resolved_subdict(&self.doc, &resources, b"Font");
            for (name, id) in fonts {
                font_dict.set(name.as_bytes(), Object::Reference(*id));
            }
            resources.set("Font", Object::Dictionary(font_dict));
        }
        if !xobjects.is_empty() {
            let mut xobject_dict = resolved_subdict(&self.doc, &resources, b"XObject");
            for (name, id) in xobjects {
                xobject_dict.set(name.as_bytes(), Object::Reference(*id));
            }
            resources.set("XObject", Object::Dictionary(xobject_dict));
        }

        let page = self.doc.get_object_mut(page_id)?.as_dict_mut()?;
        page.set("Resources", Object::Dictionary(resources));
        Ok(())
    }
}

/// Find the resources dictionary for a page, walking up the page tree
/// when the page itself carries none.
fn inherited_resources(doc: &Document, page_id: ObjectId) -> Result<Dictionary> {
    let mut dict = doc.get_dictionary(page_id)?;
    for _ in 0..16 {
        match dict.get(b"Resources") {
            Ok(Object::Dictionary(d)) => return Ok(d.clone()),
            Ok(Object::Reference(id)) => {
                return Ok(doc.get_dictionary(*id).cloned().unwrap_or_default());
            }
            _ => {}
        }
        match dict.get(b"Parent") {
            Ok(Object::Reference(id)) => dict = doc.get_dictionary(*id)?,
            _ => break,
        }
    }
    Ok(Dictionary::new())
}

fn resolved_subdict(doc: &Document, dict: &Dictionary, key: &[u8]) -> Dictionary {
    match dict.get(key) {
        Ok(Object::Dictionary(d)) => d.clone(),
        Ok(Object::Reference(id)) => doc.get_dictionary(*id).cloned().unwrap_or_default(),
        _ => Dictionary::new(),
    }
}

fn media_box(doc: &Document, obj: &Object) -> Option<[f32; 4]> {
    let items = match obj {
        Object::Array(items) => items.clone(),
        Object::Reference(id) => match doc.get_object(*id) {
            Ok(Object::Array(items)) => items.clone(),
            _ => return None,
        },
        _ => return None,
    };
    if items.len() != 4 {
        return None;
    }
    let mut bx = [0.0f32; 4];
    for (i, item) in items.iter().enumerate() {
        bx[i] = number(item)?;
    }
    Some(bx)
}

fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

fn rgb_operands(color: Color) -> Vec<Object> {
    vec![
        (color.r as f32 / 255.0).into(),
        (color.g as f32 / 255.0).into(),
        (color.b as f32 / 255.0).into(),
    ]
}

fn to_win_ansi(s: &str) -> Vec<u8> {
    s.chars()
        .map(|c| if c as u32 <= 255 { c as u8 } else { b'?' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_malformed_bytes() {
        let err = PdfDocument::load(b"definitely not a pdf").unwrap_err();
        assert!(matches!(
            err,
            crate::error::CertforgeError::Template(TemplateError::InvalidDocument { .. })
        ));
    }

    #[test]
    fn win_ansi_replaces_unmappable_chars() {
        assert_eq!(to_win_ansi("Ada"), b"Ada".to_vec());
        assert_eq!(to_win_ansi("\u{2713}"), b"?".to_vec());
    }

    #[test]
    fn format_detection_by_extension() {
        assert_eq!(RasterFormat::from_name("sig.PNG"), RasterFormat::Png);
        assert_eq!(RasterFormat::from_name("sig.jpg"), RasterFormat::Jpeg);
        assert_eq!(RasterFormat::from_name("sig.jpeg"), RasterFormat::Jpeg);
    }
}
