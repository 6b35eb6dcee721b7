//! Round-trip: parse(save(doc)) preserves the page sequence, metadata and
//! resource bytes in both writer modes.

use quillpdf::pdf::object::DictExt;
use quillpdf::{Document, LoadOptions, SaveOptions};

fn classic() -> SaveOptions {
    SaveOptions {
        use_object_streams: false,
        ..Default::default()
    }
}

fn objstm() -> SaveOptions {
    SaveOptions::default()
}

/// A document with varied page sizes, content streams and metadata.
async fn sample_document() -> Document {
    let mut doc = Document::create();
    doc.set_title("Round trip");
    let sizes = [(100.0, 200.0), (300.0, 300.0), (595.28, 841.89)];
    for (i, &size) in sizes.iter().enumerate() {
        let page = doc.add_page(size).unwrap();
        doc.set_page_content(&page, format!("BT /F1 12 Tf (page {}) Tj ET", i).into_bytes())
            .unwrap();
    }
    doc
}

fn content_bytes(doc: &Document, page: &quillpdf::Page) -> Vec<u8> {
    let dict = doc.context().dict_at(page.object_ref()).unwrap();
    let contents = dict.get_ref("Contents").unwrap();
    let (_, data) = doc.context().resolve(contents).as_stream().unwrap();
    data.to_vec()
}

async fn assert_roundtrip(options: SaveOptions) {
    let mut doc = sample_document().await;
    let original_pages = doc.pages();
    let bytes = doc.save(options).await.unwrap();

    let mut reloaded = Document::load(bytes, LoadOptions::default()).await.unwrap();
    assert_eq!(reloaded.title().as_deref(), Some("Round trip"));
    assert_eq!(reloaded.page_count(), 3);

    let reloaded_pages = reloaded.pages();
    for (a, b) in original_pages.iter().zip(&reloaded_pages) {
        assert_eq!(
            doc.page_media_box(a).unwrap(),
            reloaded.page_media_box(b).unwrap()
        );
        assert_eq!(content_bytes(&doc, a), content_bytes(&reloaded, b));
    }
}

#[tokio::test]
async fn roundtrip_classic_mode() {
    assert_roundtrip(classic()).await;
}

#[tokio::test]
async fn roundtrip_object_stream_mode() {
    assert_roundtrip(objstm()).await;
}

#[tokio::test]
async fn classic_output_uses_xref_table() {
    let mut doc = sample_document().await;
    let bytes = doc.save(classic()).await.unwrap();
    let text = String::from_utf8_lossy(&bytes);
    assert!(text.contains("\nxref\n"));
    assert!(text.contains("\ntrailer\n"));
    assert!(!text.contains("/ObjStm"));
}

#[tokio::test]
async fn objstm_output_uses_xref_stream() {
    let mut doc = sample_document().await;
    let bytes = doc.save(objstm()).await.unwrap();
    let text = String::from_utf8_lossy(&bytes);
    assert!(text.contains("/ObjStm"));
    assert!(text.contains("/XRef"));
    assert!(!text.contains("\ntrailer\n"));
}

#[tokio::test]
async fn save_load_save_is_stable() {
    // A second generation of save/load must not accumulate file plumbing
    let mut doc = sample_document().await;
    let first = doc.save(objstm()).await.unwrap();

    let mut gen2 = Document::load(first.clone(), LoadOptions::default())
        .await
        .unwrap();
    let second = gen2.save(objstm()).await.unwrap();
    let mut gen3 = Document::load(second.clone(), LoadOptions::default())
        .await
        .unwrap();

    assert_eq!(gen2.page_count(), gen3.page_count());
    assert_eq!(gen3.context().len(), gen2.context().len());
}

#[tokio::test]
async fn modes_parse_to_equivalent_documents() {
    let mut doc = sample_document().await;
    let classic_bytes = doc.save(classic()).await.unwrap();
    let objstm_bytes = doc.save(objstm()).await.unwrap();

    let mut from_classic = Document::load(classic_bytes, LoadOptions::default())
        .await
        .unwrap();
    let mut from_objstm = Document::load(objstm_bytes, LoadOptions::default())
        .await
        .unwrap();

    assert_eq!(from_classic.page_count(), from_objstm.page_count());
    let a_pages = from_classic.pages();
    let b_pages = from_objstm.pages();
    for (a, b) in a_pages.iter().zip(&b_pages) {
        assert_eq!(
            from_classic.page_media_box(a).unwrap(),
            from_objstm.page_media_box(b).unwrap()
        );
        assert_eq!(
            content_bytes(&from_classic, a),
            content_bytes(&from_objstm, b)
        );
    }
}
