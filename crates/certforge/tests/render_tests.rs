mod common;

use std::sync::Arc;

use certforge::{
    Attribute, AttributeKind, CertforgeError, Color, DataError, FontWeight, MemoryStorage, Record,
    RenderEngine, StorageGateway, Template, TextAlign, bucket,
};

use common::{blank_pdf, contains, page_content};

fn certificate_template(base: &[u8]) -> Template {
    let mut template = Template::from_document("cert", "Certificate", "cert.pdf", base).unwrap();
    template
        .add_attribute(
            Attribute::system("recipientName", 1, 297.0, 500.0)
                .unwrap()
                .with_style(
                    "Helvetica",
                    FontWeight::Bold,
                    24.0,
                    Color::BLACK,
                    TextAlign::Center,
                )
                .require(),
        )
        .unwrap();
    template
        .add_attribute(Attribute::system("generatedDate", 1, 297.0, 120.0).unwrap())
        .unwrap();
    template
}

fn engine() -> RenderEngine {
    RenderEngine::new(Arc::new(MemoryStorage::new()))
}

#[tokio::test]
async fn render_with_all_required_fields_succeeds() {
    // Scenario: required recipient present, optional date simply absent
    let base = blank_pdf(1);
    let template = certificate_template(&base);

    let mut record = Record::new();
    record.insert("recipientName".into(), "Ada Lovelace".into());

    let pdf = engine()
        .render_document(&template, &base, &record)
        .await
        .unwrap();

    let content = page_content(&pdf, 1);
    assert!(contains(&content, b"Ada Lovelace"));
    assert!(contains(&content, b"Helvetica-Bold") || contains(&content, b"CF"));
}

#[tokio::test]
async fn missing_required_field_fails_before_rendering() {
    let base = blank_pdf(1);
    let template = certificate_template(&base);

    let err = engine()
        .render_document(&template, &base, &Record::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CertforgeError::Data(DataError::MissingField { .. })
    ));
    assert!(err.to_string().contains("Recipient Name"));
}

#[tokio::test]
async fn render_is_deterministic() {
    let base = blank_pdf(1);
    let template = certificate_template(&base);

    let mut record = Record::new();
    record.insert("recipientName".into(), "Ada Lovelace".into());
    record.insert("generatedDate".into(), "June 1, 2026".into());

    let engine = engine();
    let first = engine
        .render_document(&template, &base, &record)
        .await
        .unwrap();
    let second = engine
        .render_document(&template, &base, &record)
        .await
        .unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn missing_signature_asset_is_not_fatal() {
    // Scenario D: the referenced file does not exist in storage
    let base = blank_pdf(1);
    let mut template = Template::from_document("cert", "Certificate", "cert.pdf", &base).unwrap();
    template
        .add_attribute(
            Attribute::new(
                "signature",
                "Signature",
                AttributeKind::SignatureImage,
                1,
                100.0,
                150.0,
            )
            .unwrap(),
        )
        .unwrap();

    let mut record = Record::new();
    record.insert("signature".into(), "ghost.png".into());

    let pdf = engine()
        .render_document(&template, &base, &record)
        .await
        .unwrap();
    // document still renders, the field is simply absent
    let content = page_content(&pdf, 1);
    assert!(!contains(&content, b"Do"));
}

#[tokio::test]
async fn corrupt_signature_asset_is_skipped() {
    let base = blank_pdf(1);
    let mut template = Template::from_document("cert", "Certificate", "cert.pdf", &base).unwrap();
    template
        .add_attribute(
            Attribute::new(
                "signature",
                "Signature",
                AttributeKind::SignatureImage,
                1,
                100.0,
                150.0,
            )
            .unwrap(),
        )
        .unwrap();

    let storage = Arc::new(MemoryStorage::new());
    storage
        .save(bucket::ASSETS, "broken.png", b"not a png".to_vec())
        .await
        .unwrap();

    let mut record = Record::new();
    record.insert("signature".into(), "broken.png".into());

    let engine = RenderEngine::new(storage);
    assert!(engine.render_document(&template, &base, &record).await.is_ok());
}

#[tokio::test]
async fn valid_signature_asset_is_drawn() {
    let base = blank_pdf(1);
    let mut template = Template::from_document("cert", "Certificate", "cert.pdf", &base).unwrap();
    template
        .add_attribute(
            Attribute::new(
                "signature",
                "Signature",
                AttributeKind::SignatureImage,
                1,
                100.0,
                150.0,
            )
            .unwrap()
            .with_box(90.0, 45.0),
        )
        .unwrap();

    // 2x2 white PNG built in memory
    let mut png = Vec::new();
    image::RgbImage::from_pixel(2, 2, image::Rgb([255, 255, 255]))
        .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
        .unwrap();

    let storage = Arc::new(MemoryStorage::new());
    storage
        .save(bucket::ASSETS, "sig.png", png)
        .await
        .unwrap();

    let mut record = Record::new();
    record.insert("signature".into(), "sig.png".into());

    let engine = RenderEngine::new(storage);
    let pdf = engine
        .render_document(&template, &base, &record)
        .await
        .unwrap();

    let content = page_content(&pdf, 1);
    assert!(contains(&content, b"Do"));
    assert!(contains(&content, b"CIm1"));
}

#[tokio::test]
async fn qr_attribute_draws_vector_modules() {
    let base = blank_pdf(1);
    let mut template = Template::from_document("cert", "Certificate", "cert.pdf", &base).unwrap();
    template
        .add_attribute(Attribute::system("qrCode", 1, 450.0, 80.0).unwrap().with_box(80.0, 80.0))
        .unwrap();

    let mut record = Record::new();
    record.insert(
        "qrCode".into(),
        "https://example.com/verify/cert-123".into(),
    );

    let pdf = engine()
        .render_document(&template, &base, &record)
        .await
        .unwrap();

    let content = page_content(&pdf, 1);
    assert!(contains(&content, b" re"));
}

#[tokio::test]
async fn out_of_range_page_reference_is_skipped() {
    let base = blank_pdf(1);
    let mut template = Template::from_document("cert", "Certificate", "cert.pdf", &base).unwrap();

    // bypass validation the way a stale caller would
    let mut attr = Attribute::new("note", "Note", AttributeKind::Text, 1, 50.0, 50.0).unwrap();
    attr.page = 5;
    template.attributes.push(attr);

    let mut record = Record::new();
    record.insert("note".into(), "never drawn".into());

    let pdf = engine()
        .render_document(&template, &base, &record)
        .await
        .unwrap();
    let content = page_content(&pdf, 1);
    assert!(!contains(&content, b"never drawn"));
}

#[tokio::test]
async fn attribute_on_second_page_is_drawn_there() {
    let base = blank_pdf(2);
    let mut template = Template::from_document("cert", "Certificate", "cert.pdf", &base).unwrap();
    template
        .add_attribute(
            Attribute::new("note", "Note", AttributeKind::Text, 2, 100.0, 700.0).unwrap(),
        )
        .unwrap();

    let mut record = Record::new();
    record.insert("note".into(), "appendix".into());

    let pdf = engine()
        .render_document(&template, &base, &record)
        .await
        .unwrap();

    assert!(!contains(&page_content(&pdf, 1), b"appendix"));
    assert!(contains(&page_content(&pdf, 2), b"appendix"));
}

#[tokio::test]
async fn wrapped_text_draws_one_tj_per_line() {
    let base = blank_pdf(1);
    let mut template = Template::from_document("cert", "Certificate", "cert.pdf", &base).unwrap();
    template
        .add_attribute(
            Attribute::new("citation", "Citation", AttributeKind::Text, 1, 80.0, 400.0)
                .unwrap()
                .with_max_width(120.0),
        )
        .unwrap();

    let mut record = Record::new();
    record.insert(
        "citation".into(),
        "awarded for sustained excellence in computational research".into(),
    );

    let pdf = engine()
        .render_document(&template, &base, &record)
        .await
        .unwrap();

    let content = page_content(&pdf, 1);
    let tj_count = content.windows(2).filter(|w| w == b"Tj").count();
    assert!(tj_count >= 2, "expected wrapped lines, got {tj_count} Tj op(s)");
}

#[tokio::test]
async fn malformed_base_document_is_fatal() {
    let base = blank_pdf(1);
    let template = certificate_template(&base);

    let mut record = Record::new();
    record.insert("recipientName".into(), "Ada Lovelace".into());

    let err = engine()
        .render_document(&template, b"garbage bytes", &record)
        .await
        .unwrap_err();
    assert!(matches!(err, CertforgeError::Template(_)));
}

#[tokio::test]
async fn render_fetches_base_from_templates_bucket() {
    let base = blank_pdf(1);
    let template = certificate_template(&base);

    let storage = Arc::new(MemoryStorage::new());
    storage
        .save(bucket::TEMPLATES, "cert.pdf", base)
        .await
        .unwrap();

    let mut record = Record::new();
    record.insert("recipientName".into(), "Grace Hopper".into());

    let engine = RenderEngine::new(storage);
    let pdf = engine.render(&template, &record).await.unwrap();
    assert!(contains(&page_content(&pdf, 1), b"Grace Hopper"));
}
