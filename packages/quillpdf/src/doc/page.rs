//! Handles the facade gives out: pages, fonts, images
//!
//! Handles are lightweight tokens tied to their owning document by id;
//! operations that take a handle from another document fail instead of
//! silently mixing object graphs.

use crate::embed::fontkit::FontFace;
use crate::embed::metrics;
use crate::embed::standard_font::StandardFont;
use crate::pdf::object::ObjRef;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

/// A page leaf in a document's page tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub(crate) leaf: ObjRef,
    pub(crate) doc: u64,
}

impl Page {
    /// The underlying leaf object ref.
    pub fn object_ref(&self) -> ObjRef {
        self.leaf
    }
}

/// What `add_page`/`insert_page` should insert.
#[derive(Debug, Clone, Copy, Default)]
pub enum PageInput {
    /// A fresh blank page at the default size (A4).
    #[default]
    Blank,
    /// A fresh blank page with the given width and height in points.
    Sized(f64, f64),
    /// An existing page of this document (a copied page, typically).
    Existing(Page),
}

impl From<(f64, f64)> for PageInput {
    fn from((w, h): (f64, f64)) -> Self {
        PageInput::Sized(w, h)
    }
}

impl From<Page> for PageInput {
    fn from(page: Page) -> Self {
        PageInput::Existing(page)
    }
}

#[derive(Clone)]
pub(crate) enum FontKind {
    Standard(StandardFont),
    Custom {
        face: Arc<dyn FontFace>,
        used: Arc<Mutex<BTreeSet<char>>>,
    },
}

impl std::fmt::Debug for FontKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FontKind::Standard(face) => f.debug_tuple("Standard").field(face).finish(),
            FontKind::Custom { .. } => f.debug_struct("Custom").finish_non_exhaustive(),
        }
    }
}

/// A font registered on a document; metrics answer immediately, the PDF
/// objects materialize at flush.
#[derive(Clone, Debug)]
pub struct Font {
    pub(crate) target: ObjRef,
    pub(crate) kind: FontKind,
}

impl Font {
    pub fn object_ref(&self) -> ObjRef {
        self.target
    }

    /// Width of `text` at `size`, in points.
    pub fn width_of(&self, text: &str, size: f64) -> f64 {
        match &self.kind {
            FontKind::Standard(face) => face.width_of(text, size),
            FontKind::Custom { face, .. } => {
                let upem = face.units_per_em().max(1) as f64;
                let units: u32 = text
                    .chars()
                    .map(|ch| {
                        face.glyph_for_codepoint(ch)
                            .and_then(|g| face.advance_width(g))
                            .unwrap_or(0) as u32
                    })
                    .sum();
                units as f64 * size / upem
            }
        }
    }

    /// Line height at `size`, in points.
    pub fn height_at(&self, size: f64) -> f64 {
        match &self.kind {
            FontKind::Standard(face) => face.height_at(size),
            FontKind::Custom { face, .. } => {
                let upem = face.units_per_em().max(1) as f64;
                (face.ascent() as f64 - face.descent() as f64) * size / upem
            }
        }
    }

    /// Record codepoints drawn with this font; the subset embedder covers
    /// exactly what was recorded when the document flushes.
    pub fn mark_text_used(&self, text: &str) {
        if let FontKind::Custom { used, .. } = &self.kind {
            let mut set = used.lock().expect("used-glyph set");
            set.extend(text.chars());
        }
    }

    /// The face name queries resolve against.
    pub fn name(&self) -> String {
        match &self.kind {
            FontKind::Standard(face) => face.postscript_name().to_string(),
            FontKind::Custom { face, .. } => face
                .postscript_name()
                .unwrap_or_else(|| "Embedded".to_string()),
        }
    }
}

/// An image registered on a document.
#[derive(Debug, Clone, Copy)]
pub struct Image {
    pub(crate) target: ObjRef,
    width: u32,
    height: u32,
}

impl Image {
    pub(crate) fn new(target: ObjRef, width: u32, height: u32) -> Self {
        Self {
            target,
            width,
            height,
        }
    }

    pub fn object_ref(&self) -> ObjRef {
        self.target
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel dimensions scaled by a factor, for layout math.
    pub fn scaled(&self, factor: f64) -> (f64, f64) {
        (self.width as f64 * factor, self.height as f64 * factor)
    }
}

/// Fallback width for unmapped codepoints in standard faces, re-exported
/// for callers doing their own layout.
pub const NOTDEF_WIDTH: u16 = metrics::NOTDEF_WIDTH;
