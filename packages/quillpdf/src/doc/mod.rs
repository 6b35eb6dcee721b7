//! The document facade
//!
//! Orchestrates the context, page tree, deferred embedders and writers
//! behind one handle. All mutation preconditions are checked before any
//! state changes; embeds are deferred and drained in insertion order by
//! `flush`, which `save` always runs first.

pub mod page;

pub use page::{Font, Image, Page, PageInput};

use crate::embed::custom_font::CustomFontEmbedder;
use crate::embed::fontkit::FontKit;
use crate::embed::jpeg::JpegEmbedder;
use crate::embed::png::PngEmbedder;
use crate::embed::standard_font::{StandardFont, StandardFontEmbedder};
use crate::embed::PendingEmbed;
use crate::error::{Error, ParseErrorKind, Result};
use crate::input::{self, RawInput};
use crate::page::{attrs, sizes, PageTree};
use crate::pdf::context::Context;
use crate::pdf::copier::Copier;
use crate::pdf::object::{Dict, DictExt, Name, Object, ObjRef, PdfString, StringKind};
use crate::pdf::reader::{self, ReadOptions};
use crate::writer::{self, SaveOptions};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

static NEXT_DOC_ID: AtomicU64 = AtomicU64::new(1);

/// Options for [`Document::load`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadOptions {
    /// Load encrypted documents anyway; no decryption is attempted.
    pub ignore_encryption: bool,
    /// Objects parsed between cooperative yields; 0 never yields. The
    /// presets live in [`crate::pdf::reader::parse_speeds`].
    pub parse_speed: u32,
}

/// Options for [`Document::embed_font`].
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbedFontOptions {
    /// Embed only the glyphs marked used instead of the whole program.
    pub subset: bool,
}

/// Options for [`Document::save_as_base64`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Base64SaveOptions {
    /// Prepend the `data:application/pdf;base64,` header.
    pub data_uri: bool,
    pub save: SaveOptions,
}

/// A PDF document: one context, one page tree, pending embeds.
pub struct Document {
    ctx: Context,
    catalog: ObjRef,
    tree: PageTree,
    id: u64,
    fontkit: Option<Arc<dyn FontKit>>,
    pending: Vec<PendingEmbed>,
    leaves_cache: Option<Vec<ObjRef>>,
    encrypted: bool,
}

impl Document {
    /// A fresh document with an empty page tree.
    pub fn create() -> Document {
        let mut ctx = Context::new();
        let root = PageTree::create_root(&mut ctx);
        let catalog = ctx.register(Object::Dict(crate::dict! {
            "Type" => "Catalog",
            "Pages" => root,
        }));
        ctx.trailer_mut().root = Some(catalog);
        Document::from_parts(ctx, catalog, root, false)
    }

    /// Parse a PDF from bytes, base64 or a data URI.
    pub async fn load(input: impl Into<RawInput>, options: LoadOptions) -> Result<Document> {
        let bytes = input::into_bytes(input.into())?;
        let read_opts = ReadOptions {
            objects_per_yield: options.parse_speed,
        };
        let ctx = reader::read_document(&bytes, &read_opts).await?;

        let encrypted = ctx.trailer().encrypt.is_some();
        if encrypted && !options.ignore_encryption {
            return Err(Error::EncryptedPdf);
        }

        let catalog = ctx
            .trailer()
            .root
            .ok_or_else(|| Error::parse(0, ParseErrorKind::BadXref))?;
        let root = ctx
            .dict_at(catalog)
            .and_then(|d| d.get_ref("Pages"))
            .ok_or_else(|| Error::parse(0, ParseErrorKind::BadXref))?;
        Ok(Document::from_parts(ctx, catalog, root, encrypted))
    }

    fn from_parts(ctx: Context, catalog: ObjRef, root: ObjRef, encrypted: bool) -> Document {
        Document {
            ctx,
            catalog,
            tree: PageTree::new(root),
            id: NEXT_DOC_ID.fetch_add(1, Ordering::Relaxed),
            fontkit: None,
            pending: Vec::new(),
            leaves_cache: None,
            encrypted,
        }
    }

    /// The document's object arena, for direct graph inspection.
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn catalog_ref(&self) -> ObjRef {
        self.catalog
    }

    pub fn is_encrypted(&self) -> bool {
        self.encrypted
    }

    // ------------------------------------------------------------------
    // Pages

    pub fn page_count(&self) -> usize {
        self.tree.count(&self.ctx)
    }

    /// All pages in rendering order.
    pub fn pages(&mut self) -> Vec<Page> {
        let doc = self.id;
        self.leaves()
            .iter()
            .map(|leaf| Page { leaf: *leaf, doc })
            .collect()
    }

    pub fn page(&mut self, index: usize) -> Option<Page> {
        self.pages().get(index).copied()
    }

    pub fn page_indices(&self) -> Vec<usize> {
        (0..self.page_count()).collect()
    }

    fn leaves(&mut self) -> &[ObjRef] {
        if self.leaves_cache.is_none() {
            self.leaves_cache = Some(self.tree.leaves(&self.ctx));
        }
        self.leaves_cache.as_deref().expect("cache just filled")
    }

    fn invalidate_pages(&mut self) {
        self.leaves_cache = None;
    }

    /// Append a page; see [`insert_page`](Self::insert_page).
    pub fn add_page(&mut self, input: impl Into<PageInput>) -> Result<Page> {
        self.insert_page(self.page_count(), input)
    }

    /// Insert a page at an index between 0 and the page count.
    ///
    /// Blank inputs become fresh leaves; an existing page must belong to
    /// this document, so foreign pages go through
    /// [`copy_pages`](Self::copy_pages) first. An existing page that is
    /// already in the tree is moved, and the index is interpreted with
    /// that page detached.
    pub fn insert_page(&mut self, index: usize, input: impl Into<PageInput>) -> Result<Page> {
        let leaf = match input.into() {
            PageInput::Blank => {
                let (w, h) = sizes::A4;
                self.new_leaf(w, h)
            }
            PageInput::Sized(w, h) => {
                if !(w.is_finite() && h.is_finite() && w > 0.0 && h > 0.0) {
                    return Err(Error::invalid(format!(
                        "page dimensions {}x{} out of range",
                        w, h
                    )));
                }
                self.new_leaf(w, h)
            }
            PageInput::Existing(page) => {
                if page.doc != self.id {
                    return Err(Error::ForeignPage);
                }
                if self.ctx.dict_at(page.leaf).is_none() {
                    return Err(Error::invalid(
                        "page was removed from the document; its handle is stale",
                    ));
                }
                page.leaf
            }
        };

        self.tree.insert(&mut self.ctx, leaf, index)?;
        self.invalidate_pages();
        Ok(Page {
            leaf,
            doc: self.id,
        })
    }

    /// Remove the page at an index and release its objects.
    ///
    /// The leaf and everything only it references (its content stream,
    /// page-local resources) leave the context; objects still reachable
    /// from the rest of the document survive.
    pub fn remove_page(&mut self, index: usize) -> Result<()> {
        let count = self.page_count();
        if count == 0 {
            return Err(Error::RemovePageFromEmptyDocument);
        }
        if index >= count {
            return Err(Error::PageIndexOutOfRange { index, count });
        }
        let removed = self.tree.remove(&mut self.ctx, index)?;
        self.release_orphaned(removed);
        self.invalidate_pages();
        Ok(())
    }

    /// Delete a detached subgraph, keeping anything shared with the live
    /// document graph.
    fn release_orphaned(&mut self, detached: ObjRef) {
        let mut live_roots = Vec::new();
        let trailer = self.ctx.trailer();
        live_roots.extend(trailer.root);
        live_roots.extend(trailer.info);
        live_roots.extend(trailer.encrypt);

        let live = self.ctx.reachable_from(&live_roots);
        for r in self.ctx.reachable_from(&[detached]) {
            if !live.contains(&r) {
                self.ctx.delete(r);
            }
        }
    }

    fn new_leaf(&mut self, width: f64, height: f64) -> ObjRef {
        self.ctx.register(Object::Dict(crate::dict! {
            "Type" => "Page",
            "MediaBox" => Object::real_array(&[0.0, 0.0, width, height]),
            "Resources" => Dict::new(),
        }))
    }

    /// Deep-copy pages out of another document, in the order given.
    ///
    /// The source flushes first so pending embeds are part of what gets
    /// copied. The returned pages belong to this document but are not in
    /// its tree yet; add them with `add_page`/`insert_page`.
    pub async fn copy_pages(&mut self, src: &mut Document, indices: &[usize]) -> Result<Vec<Page>> {
        src.flush().await?;

        let mut copier = Copier::new(&src.ctx);
        let mut out = Vec::with_capacity(indices.len());
        for &index in indices {
            let leaf = src.tree.leaf_at(&src.ctx, index).ok_or_else(|| {
                Error::PageIndexOutOfRange {
                    index,
                    count: src.tree.count(&src.ctx),
                }
            })?;

            // Inherited attributes are materialized onto the leaf before
            // the parent link is dropped, so the copy is self-contained.
            let mut dict = src
                .ctx
                .dict_at(leaf)
                .cloned()
                .unwrap_or_default();
            for key in attrs::INHERITABLE {
                if dict.get_key(key).is_none() {
                    if let Some(value) = attrs::resolve(&src.ctx, leaf, key) {
                        dict.set(key, value);
                    }
                }
            }
            dict.shift_remove(&Name::new("Parent"));

            let copied = copier.copy_value(&mut self.ctx, &Object::Dict(dict));
            let target = self.ctx.register(copied);
            out.push(Page {
                leaf: target,
                doc: self.id,
            });
        }
        Ok(out)
    }

    // ------------------------------------------------------------------
    // Page attribute accessors

    pub fn page_media_box(&self, page: &Page) -> Result<[f64; 4]> {
        self.check_page(page)?;
        attrs::media_box(&self.ctx, page.leaf)
            .ok_or_else(|| Error::invalid("page has no MediaBox"))
    }

    /// `(width, height)` of the page's media box.
    pub fn page_size(&self, page: &Page) -> Result<(f64, f64)> {
        let [x0, y0, x1, y1] = self.page_media_box(page)?;
        Ok((x1 - x0, y1 - y0))
    }

    pub fn page_rotation(&self, page: &Page) -> Result<i64> {
        self.check_page(page)?;
        Ok(attrs::rotation(&self.ctx, page.leaf))
    }

    /// Replace a page's content stream with raw drawing operators.
    pub fn set_page_content(&mut self, page: &Page, operators: Vec<u8>) -> Result<()> {
        self.check_page(page)?;
        let content = self.ctx.register(Object::Stream {
            dict: crate::dict! { "Length" => operators.len() },
            data: operators,
        });
        if let Some(dict) = self.ctx.dict_at_mut(page.leaf) {
            dict.set("Contents", content);
        }
        Ok(())
    }

    fn check_page(&self, page: &Page) -> Result<()> {
        if page.doc != self.id {
            return Err(Error::ForeignPage);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Embedding

    /// Register the fontkit custom-font embedding goes through.
    pub fn register_fontkit(&mut self, kit: Arc<dyn FontKit>) {
        self.fontkit = Some(kit);
    }

    /// One of the fourteen viewer-provided faces; no program bytes are
    /// embedded.
    pub fn embed_standard_font(&mut self, face: StandardFont) -> Font {
        let target = self.ctx.next_ref();
        self.pending.push(PendingEmbed {
            target,
            embedder: Box::new(StandardFontEmbedder::new(face)),
            done: false,
        });
        Font {
            target,
            kind: page::FontKind::Standard(face),
        }
    }

    /// Embed a font. A string naming a standard face selects the standard
    /// embedder; anything else is treated as font-program bytes and needs
    /// a registered fontkit.
    pub async fn embed_font(
        &mut self,
        input: impl Into<RawInput>,
        options: EmbedFontOptions,
    ) -> Result<Font> {
        let raw = input.into();
        if let RawInput::Text(text) = &raw {
            if let Some(face) = StandardFont::from_name(text) {
                return Ok(self.embed_standard_font(face));
            }
        }
        let bytes = input::into_bytes(raw)?;
        let kit = self.fontkit.as_ref().ok_or(Error::FontkitNotRegistered)?;
        let face: Arc<dyn crate::embed::fontkit::FontFace> = Arc::from(kit.parse(bytes)?);
        let used = Arc::new(Mutex::new(BTreeSet::new()));

        let target = self.ctx.next_ref();
        self.pending.push(PendingEmbed {
            target,
            embedder: Box::new(CustomFontEmbedder::new(
                face.clone(),
                options.subset,
                used.clone(),
            )),
            done: false,
        });
        Ok(Font {
            target,
            kind: page::FontKind::Custom { face, used },
        })
    }

    /// Embed a JPEG; the file bytes pass through with `/DCTDecode`.
    pub async fn embed_jpg(&mut self, input: impl Into<RawInput>) -> Result<Image> {
        let bytes = input::into_bytes(input.into())?;
        let embedder = JpegEmbedder::new(bytes)?;
        let (w, h) = (embedder.width(), embedder.height());
        let target = self.ctx.next_ref();
        self.pending.push(PendingEmbed {
            target,
            embedder: Box::new(embedder),
            done: false,
        });
        Ok(Image::new(target, w, h))
    }

    /// Embed a PNG; alpha channels split into a soft mask.
    pub async fn embed_png(&mut self, input: impl Into<RawInput>) -> Result<Image> {
        let bytes = input::into_bytes(input.into())?;
        let embedder = PngEmbedder::new(bytes)?;
        let (w, h) = (embedder.width(), embedder.height());
        let target = self.ctx.next_ref();
        self.pending.push(PendingEmbed {
            target,
            embedder: Box::new(embedder),
            done: false,
        });
        Ok(Image::new(target, w, h))
    }

    /// Materialize every pending embed, in insertion order. Idempotent;
    /// `save` calls this first.
    pub async fn flush(&mut self) -> Result<()> {
        for i in 0..self.pending.len() {
            if self.pending[i].done {
                continue;
            }
            let target = self.pending[i].target;
            self.pending[i].embedder.embed_into(&mut self.ctx, target)?;
            self.pending[i].done = true;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Metadata

    fn info_dict_mut(&mut self) -> &mut Dict {
        if self.ctx.trailer().info.is_none() {
            let info = self.ctx.register(Object::Dict(Dict::new()));
            self.ctx.trailer_mut().info = Some(info);
        }
        let info = self.ctx.trailer().info.expect("info just ensured");
        self.ctx
            .dict_at_mut(info)
            .expect("info dict resolves")
    }

    fn set_info_text(&mut self, key: &str, value: &str) {
        self.info_dict_mut().set(
            key,
            PdfString::new(value.as_bytes().to_vec(), StringKind::Literal),
        );
    }

    fn info_text(&self, key: &str) -> Option<String> {
        let info = self.ctx.trailer().info?;
        self.ctx
            .dict_at(info)?
            .get_key(key)?
            .as_string()?
            .as_str()
            .map(str::to_string)
    }

    pub fn set_title(&mut self, title: &str) {
        self.set_info_text("Title", title);
    }

    pub fn title(&self) -> Option<String> {
        self.info_text("Title")
    }

    pub fn set_author(&mut self, author: &str) {
        self.set_info_text("Author", author);
    }

    pub fn author(&self) -> Option<String> {
        self.info_text("Author")
    }

    pub fn set_subject(&mut self, subject: &str) {
        self.set_info_text("Subject", subject);
    }

    pub fn subject(&self) -> Option<String> {
        self.info_text("Subject")
    }

    pub fn set_keywords(&mut self, keywords: &str) {
        self.set_info_text("Keywords", keywords);
    }

    pub fn keywords(&self) -> Option<String> {
        self.info_text("Keywords")
    }

    pub fn set_creator(&mut self, creator: &str) {
        self.set_info_text("Creator", creator);
    }

    pub fn creator(&self) -> Option<String> {
        self.info_text("Creator")
    }

    pub fn set_producer(&mut self, producer: &str) {
        self.set_info_text("Producer", producer);
    }

    pub fn producer(&self) -> Option<String> {
        self.info_text("Producer")
    }

    // ------------------------------------------------------------------
    // Saving

    /// Serialize to PDF bytes.
    pub async fn save(&mut self, options: SaveOptions) -> Result<Vec<u8>> {
        if options.add_default_page && self.page_count() == 0 {
            self.add_page(PageInput::Blank)?;
        }
        self.flush().await?;
        if options.use_object_streams {
            writer::objstm::write(&self.ctx, options.objects_per_tick).await
        } else {
            writer::classic::write(&self.ctx, options.objects_per_tick).await
        }
    }

    /// Serialize and base64-encode, optionally as a data URI.
    pub async fn save_as_base64(&mut self, options: Base64SaveOptions) -> Result<String> {
        let bytes = self.save(options.save).await?;
        let encoded = input::encode_base64(&bytes);
        Ok(if options.data_uri {
            format!("data:application/pdf;base64,{}", encoded)
        } else {
            encoded
        })
    }
}
