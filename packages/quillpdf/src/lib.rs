//! quillpdf - create and modify PDF documents
//!
//! The library parses PDF byte streams into an indirect-object graph,
//! exposes pages, fonts and images for mutation, and serializes back to
//! standards-conformant bytes with either a classical cross-reference
//! table or object streams.
//!
//! # Modules
//!
//! - `pdf` - the object graph: values, arena, lexer/parser, xref, copier
//! - `page` - the balanced page tree and inherited attributes
//! - `embed` - font and image embedders, the fontkit boundary
//! - `doc` - the `Document` facade
//! - `writer` - the two serialization modes
//!
//! # Example
//!
//! ```
//! use quillpdf::{Document, PageInput, SaveOptions};
//!
//! # async fn demo() -> quillpdf::Result<()> {
//! let mut doc = Document::create();
//! doc.add_page(PageInput::Sized(612.0, 792.0))?;
//! let bytes = doc.save(SaveOptions::default()).await?;
//! assert!(bytes.starts_with(b"%PDF-"));
//! # Ok(())
//! # }
//! ```

pub mod doc;
pub mod embed;
pub mod error;
pub mod input;
pub mod page;
pub mod pdf;
pub mod writer;

pub use doc::{
    Base64SaveOptions, Document, EmbedFontOptions, Font, Image, LoadOptions, Page, PageInput,
};
pub use embed::fontkit::{FontFace, FontKit, TtfFontKit};
pub use embed::standard_font::StandardFont;
pub use error::{EmbedErrorKind, Error, ParseErrorKind, Result};
pub use pdf::reader::parse_speeds;
pub use writer::SaveOptions;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
