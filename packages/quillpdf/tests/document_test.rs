//! Document facade behavior: creation, page mutation, metadata, saving.

use quillpdf::{
    Base64SaveOptions, Document, Error, LoadOptions, PageInput, SaveOptions, StandardFont,
};

fn no_default_page() -> SaveOptions {
    SaveOptions {
        add_default_page: false,
        ..Default::default()
    }
}

#[tokio::test]
async fn create_and_save_empty_yields_one_a4_page() {
    let mut doc = Document::create();
    let bytes = doc.save(SaveOptions::default()).await.unwrap();
    assert!(bytes.starts_with(b"%PDF-1.7"));
    assert!(bytes.ends_with(b"%%EOF\n"));

    let mut reloaded = Document::load(bytes, LoadOptions::default()).await.unwrap();
    assert_eq!(reloaded.page_count(), 1);
    let page = reloaded.page(0).unwrap();
    let media_box = reloaded.page_media_box(&page).unwrap();
    assert_eq!(media_box, [0.0, 0.0, 595.28, 841.89]);
}

#[tokio::test]
async fn add_default_page_is_one_shot_and_skippable() {
    let mut doc = Document::create();
    let bytes = doc.save(no_default_page()).await.unwrap();
    let reloaded = Document::load(bytes, LoadOptions::default()).await.unwrap();
    assert_eq!(reloaded.page_count(), 0);

    // With the default option the page is added during save and persists
    let mut doc = Document::create();
    doc.save(SaveOptions::default()).await.unwrap();
    assert_eq!(doc.page_count(), 1);
    doc.remove_page(0).unwrap();
    let bytes = doc.save(no_default_page()).await.unwrap();
    let reloaded = Document::load(bytes, LoadOptions::default()).await.unwrap();
    assert_eq!(reloaded.page_count(), 0);
}

#[tokio::test]
async fn insert_at_head_orders_pages() {
    let mut doc = Document::create();
    doc.add_page((100.0, 100.0)).unwrap();
    doc.insert_page(0, (200.0, 200.0)).unwrap();

    let pages = doc.pages();
    assert_eq!(pages.len(), 2);
    assert_eq!(
        doc.page_media_box(&pages[0]).unwrap(),
        [0.0, 0.0, 200.0, 200.0]
    );
    assert_eq!(
        doc.page_media_box(&pages[1]).unwrap(),
        [0.0, 0.0, 100.0, 100.0]
    );
    assert_eq!(doc.page_indices(), vec![0, 1]);
}

#[tokio::test]
async fn insert_existing_page_moves_it() {
    let mut doc = Document::create();
    doc.add_page((100.0, 100.0)).unwrap();
    doc.add_page((200.0, 200.0)).unwrap();
    doc.add_page((300.0, 300.0)).unwrap();

    // Re-inserting a linked page moves it; the index is interpreted with
    // the page already detached
    let first = doc.page(0).unwrap();
    doc.insert_page(2, first).unwrap();

    assert_eq!(doc.page_count(), 3);
    let pages = doc.pages();
    let widths: Vec<f64> = pages
        .iter()
        .map(|p| doc.page_size(p).unwrap().0)
        .collect();
    assert_eq!(widths, vec![200.0, 300.0, 100.0]);

    // Count-derived and traversal-derived views agree after the move
    assert_eq!(doc.pages().len(), doc.page_count());
}

#[tokio::test]
async fn removed_page_objects_are_released() {
    let mut doc = Document::create();
    let keep = doc.add_page((100.0, 100.0)).unwrap();
    let doomed = doc.add_page((200.0, 200.0)).unwrap();
    doc.set_page_content(&keep, b"KEPT-MARKER".to_vec()).unwrap();
    doc.set_page_content(&doomed, b"DROPPED-MARKER".to_vec())
        .unwrap();

    let before = doc.context().len();
    doc.remove_page(1).unwrap();
    // The leaf and its content stream both leave the context
    assert_eq!(doc.context().len(), before - 2);
    assert!(doc.context().get(doomed.object_ref()).is_none());

    let bytes = doc.save(no_default_page()).await.unwrap();
    let text = String::from_utf8_lossy(&bytes);
    assert!(text.contains("KEPT-MARKER"));
    assert!(!text.contains("DROPPED-MARKER"));
}

#[tokio::test]
async fn removed_page_handle_is_stale() {
    let mut doc = Document::create();
    doc.add_page(PageInput::Blank).unwrap();
    let page = doc.page(0).unwrap();
    doc.remove_page(0).unwrap();

    let err = doc.insert_page(0, page).unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
    assert_eq!(doc.page_count(), 0);
}

#[tokio::test]
async fn remove_from_empty_fails_and_leaves_document_unchanged() {
    let mut doc = Document::create();
    let err = doc.remove_page(0).unwrap_err();
    assert!(matches!(err, Error::RemovePageFromEmptyDocument));
    assert_eq!(doc.page_count(), 0);

    // The failed call must not have touched the graph
    let bytes = doc.save(no_default_page()).await.unwrap();
    let reloaded = Document::load(bytes, LoadOptions::default()).await.unwrap();
    assert_eq!(reloaded.page_count(), 0);
}

#[tokio::test]
async fn remove_page_out_of_range_reports_count() {
    let mut doc = Document::create();
    doc.add_page(PageInput::Blank).unwrap();
    let err = doc.remove_page(5).unwrap_err();
    assert!(matches!(
        err,
        Error::PageIndexOutOfRange { index: 5, count: 1 }
    ));
    assert_eq!(doc.page_count(), 1);
}

#[tokio::test]
async fn invalid_page_dimensions_rejected() {
    let mut doc = Document::create();
    assert!(doc.add_page((0.0, 100.0)).is_err());
    assert!(doc.add_page((100.0, -5.0)).is_err());
    assert!(doc.add_page((f64::NAN, 100.0)).is_err());
    assert_eq!(doc.page_count(), 0);
}

#[tokio::test]
async fn metadata_survives_save_and_load() {
    let mut doc = Document::create();
    doc.set_title("Quarterly Report");
    doc.set_author("Jan Doe");
    doc.set_subject("Numbers");
    doc.set_creator("quillpdf tests");
    doc.set_producer("quillpdf");
    doc.set_keywords("pdf, test");

    let bytes = doc.save(SaveOptions::default()).await.unwrap();
    let reloaded = Document::load(bytes, LoadOptions::default()).await.unwrap();
    assert_eq!(reloaded.title().as_deref(), Some("Quarterly Report"));
    assert_eq!(reloaded.author().as_deref(), Some("Jan Doe"));
    assert_eq!(reloaded.subject().as_deref(), Some("Numbers"));
    assert_eq!(reloaded.creator().as_deref(), Some("quillpdf tests"));
    assert_eq!(reloaded.producer().as_deref(), Some("quillpdf"));
    assert_eq!(reloaded.keywords().as_deref(), Some("pdf, test"));
}

#[tokio::test]
async fn save_as_base64_optionally_prepends_data_uri() {
    let mut doc = Document::create();
    let plain = doc.save_as_base64(Base64SaveOptions::default()).await.unwrap();
    assert!(!plain.starts_with("data:"));

    let mut doc = Document::create();
    let uri = doc
        .save_as_base64(Base64SaveOptions {
            data_uri: true,
            ..Default::default()
        })
        .await
        .unwrap();
    let payload = uri.strip_prefix("data:application/pdf;base64,").unwrap();

    // The payload itself loads as a document again
    let reloaded = Document::load(payload.to_string(), LoadOptions::default())
        .await
        .unwrap();
    assert_eq!(reloaded.page_count(), 1);
}

#[tokio::test]
async fn flush_is_idempotent_and_save_output_stable() {
    let mut doc = Document::create();
    doc.add_page(PageInput::Blank).unwrap();
    doc.embed_standard_font(StandardFont::Helvetica);

    doc.flush().await.unwrap();
    let first = doc.save(SaveOptions::default()).await.unwrap();
    doc.flush().await.unwrap();
    doc.flush().await.unwrap();
    let second = doc.save(SaveOptions::default()).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn load_accepts_base64_input() {
    let mut doc = Document::create();
    doc.add_page((300.0, 300.0)).unwrap();
    let b64 = doc.save_as_base64(Base64SaveOptions::default()).await.unwrap();

    let mut reloaded = Document::load(b64, LoadOptions::default()).await.unwrap();
    assert_eq!(reloaded.page_count(), 1);
    let page = reloaded.page(0).unwrap();
    assert_eq!(reloaded.page_size(&page).unwrap(), (300.0, 300.0));
}

#[tokio::test]
async fn parse_speed_knob_does_not_change_output() {
    let mut doc = Document::create();
    for _ in 0..20 {
        doc.add_page(PageInput::Blank).unwrap();
    }
    let bytes = doc.save(SaveOptions::default()).await.unwrap();

    for speed in [0u32, 1500, 500, 100, 1] {
        let reloaded = Document::load(
            bytes.clone(),
            LoadOptions {
                parse_speed: speed,
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(reloaded.page_count(), 20, "parse_speed {}", speed);
    }
}
