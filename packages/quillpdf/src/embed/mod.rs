//! Font and image embedders
//!
//! An embedder validates its external format at construction and
//! materializes the PDF object subgraph later, at document flush, into a
//! ref the document reserved up front. Embedding is idempotent: the
//! document tracks which pending embeds already ran.

pub mod custom_font;
pub mod fontkit;
pub mod jpeg;
pub mod metrics;
pub mod png;
pub mod standard_font;

use crate::error::Result;
use crate::pdf::context::Context;
use crate::pdf::object::ObjRef;

/// Two-phase converter from an external format to PDF objects.
///
/// `embed_into` fills the object previously reserved at `target`; it may
/// register additional helper objects (font descriptors, soft masks).
pub trait Embedder {
    fn embed_into(&self, ctx: &mut Context, target: ObjRef) -> Result<()>;
}

/// A deferred embed the document drains on flush, in insertion order.
pub(crate) struct PendingEmbed {
    pub target: ObjRef,
    pub embedder: Box<dyn Embedder>,
    pub done: bool,
}
