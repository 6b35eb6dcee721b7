//! Page-tree invariants under random mutation, checked through the public
//! document API and the underlying object graph.

use quillpdf::pdf::context::Context;
use quillpdf::pdf::object::{DictExt, Object, ObjRef};
use quillpdf::{Document, LoadOptions, PageInput, SaveOptions};
use std::collections::HashSet;

const BRANCHING: usize = 16;

/// Walk the tree from the catalog checking counts, parent links, fill
/// bounds and single reachability. Returns the leaf count.
fn check_tree(ctx: &Context, catalog: ObjRef) -> usize {
    let root = ctx
        .dict_at(catalog)
        .and_then(|d| d.get_ref("Pages"))
        .expect("catalog points at the page tree");
    let mut seen = HashSet::new();
    walk(ctx, root, None, &mut seen)
}

fn kids_of(ctx: &Context, node: ObjRef) -> Vec<ObjRef> {
    ctx.dict_at(node)
        .and_then(|d| d.get_key("Kids"))
        .and_then(Object::as_array)
        .map(|a| a.iter().filter_map(Object::as_ref_obj).collect())
        .unwrap_or_default()
}

fn walk(
    ctx: &Context,
    node: ObjRef,
    parent: Option<ObjRef>,
    seen: &mut HashSet<ObjRef>,
) -> usize {
    let dict = ctx.dict_at(node).expect("tree node resolves");
    if let Some(parent) = parent {
        assert_eq!(
            dict.get_ref("Parent"),
            Some(parent),
            "node {} has a broken parent link",
            node.num
        );
    }
    if dict.is_type("Page") {
        assert!(seen.insert(node), "leaf {} reachable twice", node.num);
        return 1;
    }

    let kids = kids_of(ctx, node);
    assert!(
        kids.len() <= BRANCHING,
        "node {} exceeds branching factor: {} kids",
        node.num,
        kids.len()
    );
    if parent.is_some() {
        assert!(
            kids.len() >= BRANCHING.div_ceil(2),
            "non-root node {} underfull: {} kids",
            node.num,
            kids.len()
        );
    }
    let total: usize = kids.iter().map(|kid| walk(ctx, *kid, Some(node), seen)).sum();
    assert_eq!(
        dict.get_int("Count").unwrap_or(0) as usize,
        total,
        "node {} count mismatch",
        node.num
    );
    total
}

#[tokio::test]
async fn counts_track_leaves_through_growth() {
    let mut doc = Document::create();
    for i in 0..120 {
        doc.add_page(PageInput::Blank).unwrap();
        assert_eq!(doc.page_count(), i + 1);
        assert_eq!(check_tree(doc.context(), doc.catalog_ref()), i + 1);
    }
}

#[tokio::test]
async fn random_mutations_hold_invariants() {
    // Deterministic LCG; widths tag each page so order is observable
    let mut state: u64 = 0x9E3779B97F4A7C15;
    let mut next = move || {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (state >> 33) as usize
    };

    let mut doc = Document::create();
    let mut widths: Vec<f64> = Vec::new();
    let mut tag = 10.0;

    for step in 0..400 {
        let remove = !widths.is_empty() && next() % 3 == 0;
        if remove {
            let index = next() % widths.len();
            doc.remove_page(index).unwrap();
            widths.remove(index);
        } else {
            let index = next() % (widths.len() + 1);
            tag += 1.0;
            doc.insert_page(index, (tag, tag)).unwrap();
            widths.insert(index, tag);
        }

        assert_eq!(doc.page_count(), widths.len(), "step {}", step);
        assert_eq!(
            check_tree(doc.context(), doc.catalog_ref()),
            widths.len(),
            "step {}",
            step
        );
        let pages = doc.pages();
        let observed: Vec<f64> = pages
            .iter()
            .map(|p| doc.page_size(p).unwrap().0)
            .collect();
        assert_eq!(observed, widths, "step {}", step);
    }
}

#[tokio::test]
async fn deep_tree_survives_roundtrip() {
    let mut doc = Document::create();
    for i in 0..60 {
        doc.add_page(((100 + i) as f64, 100.0)).unwrap();
    }
    let bytes = doc.save(SaveOptions::default()).await.unwrap();

    let mut reloaded = Document::load(bytes, LoadOptions::default()).await.unwrap();
    assert_eq!(reloaded.page_count(), 60);
    assert_eq!(check_tree(reloaded.context(), reloaded.catalog_ref()), 60);
    let pages = reloaded.pages();
    for (i, page) in pages.iter().enumerate() {
        assert_eq!(reloaded.page_size(page).unwrap().0, (100 + i) as f64);
    }
}

#[tokio::test]
async fn removal_all_the_way_down_collapses_cleanly() {
    let mut doc = Document::create();
    for _ in 0..50 {
        doc.add_page(PageInput::Blank).unwrap();
    }
    while doc.page_count() > 0 {
        doc.remove_page(doc.page_count() / 2).unwrap();
        assert_eq!(
            check_tree(doc.context(), doc.catalog_ref()),
            doc.page_count()
        );
    }
}
