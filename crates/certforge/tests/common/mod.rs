//! Shared test helpers.

use lopdf::{Document, Object, Stream, dictionary};

/// Build a blank A4 document with the given number of pages.
pub fn blank_pdf(page_count: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let mut kids = Vec::new();
    for _ in 0..page_count {
        let content_id = doc.add_object(Stream::new(dictionary! {}, Vec::new()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut std::io::Cursor::new(&mut bytes)).unwrap();
    bytes
}

/// Decoded content of a page (1-indexed) in a rendered document.
pub fn page_content(pdf: &[u8], page_number: u32) -> Vec<u8> {
    let doc = Document::load_mem(pdf).expect("rendered output should parse");
    let pages = doc.get_pages();
    let page_id = pages.get(&page_number).expect("page should exist");
    doc.get_page_content(*page_id).unwrap()
}

pub fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}
