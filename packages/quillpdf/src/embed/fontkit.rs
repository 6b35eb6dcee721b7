//! The fontkit collaborator boundary
//!
//! Custom-font embedding needs glyph metrics, a character map and
//! (optionally) subsetting. The core never inspects a font program
//! itself; it talks to these traits. A ttf-parser-backed kit ships as the
//! default implementation callers can register.

use crate::error::{EmbedErrorKind, Error, Result};
use ttf_parser::GlyphId;

/// Parses font programs into faces. Registered on a document before any
/// custom font embed.
pub trait FontKit: Send + Sync {
    fn parse(&self, bytes: Vec<u8>) -> Result<Box<dyn FontFace>>;
}

/// One parsed font program.
pub trait FontFace: Send + Sync + std::fmt::Debug {
    fn postscript_name(&self) -> Option<String>;
    /// Design units per em square.
    fn units_per_em(&self) -> u16;
    fn ascent(&self) -> i16;
    fn descent(&self) -> i16;
    fn cap_height(&self) -> Option<i16>;
    fn italic_angle(&self) -> f64;
    /// `[x_min, y_min, x_max, y_max]` in design units.
    fn bbox(&self) -> [i16; 4];
    fn is_fixed_pitch(&self) -> bool;
    /// True for CFF-flavored (OpenType) outlines, false for TrueType.
    fn is_cff(&self) -> bool;
    fn glyph_count(&self) -> u16;
    fn glyph_for_codepoint(&self, cp: char) -> Option<u16>;
    /// Advance width of a glyph in design units.
    fn advance_width(&self, glyph: u16) -> Option<u16>;
    /// Every `(codepoint, glyph)` pair of the unicode character map.
    fn char_map(&self) -> Vec<(u32, u16)>;
    /// A font program containing at least the requested glyphs.
    fn subset(&self, glyphs: &[u16]) -> Result<Vec<u8>>;
    /// The original font program bytes.
    fn font_bytes(&self) -> &[u8];
}

/// The built-in kit, backed by ttf-parser.
#[derive(Debug, Default, Clone, Copy)]
pub struct TtfFontKit;

impl FontKit for TtfFontKit {
    fn parse(&self, bytes: Vec<u8>) -> Result<Box<dyn FontFace>> {
        // Validate eagerly so construction fails, not first use
        ttf_parser::Face::parse(&bytes, 0)
            .map_err(|_| Error::Embed(EmbedErrorKind::FontParseFailed))?;
        Ok(Box::new(TtfFace { data: bytes }))
    }
}

/// A face that re-parses its owned bytes per query; ttf-parser's `Face`
/// borrows the buffer, so holding one would pin `self` to itself.
#[derive(Debug)]
struct TtfFace {
    data: Vec<u8>,
}

impl TtfFace {
    fn face(&self) -> ttf_parser::Face<'_> {
        // Parse succeeded in `FontKit::parse`
        ttf_parser::Face::parse(&self.data, 0).expect("validated font program")
    }
}

impl FontFace for TtfFace {
    fn postscript_name(&self) -> Option<String> {
        let face = self.face();
        face.names()
            .into_iter()
            .find(|n| n.name_id == ttf_parser::name_id::POST_SCRIPT_NAME && n.is_unicode())
            .and_then(|n| n.to_string())
    }

    fn units_per_em(&self) -> u16 {
        self.face().units_per_em()
    }

    fn ascent(&self) -> i16 {
        self.face().ascender()
    }

    fn descent(&self) -> i16 {
        self.face().descender()
    }

    fn cap_height(&self) -> Option<i16> {
        self.face().capital_height()
    }

    fn italic_angle(&self) -> f64 {
        self.face().italic_angle() as f64
    }

    fn bbox(&self) -> [i16; 4] {
        let rect = self.face().global_bounding_box();
        [rect.x_min, rect.y_min, rect.x_max, rect.y_max]
    }

    fn is_fixed_pitch(&self) -> bool {
        self.face().is_monospaced()
    }

    fn is_cff(&self) -> bool {
        self.face().tables().cff.is_some()
    }

    fn glyph_count(&self) -> u16 {
        self.face().number_of_glyphs()
    }

    fn glyph_for_codepoint(&self, cp: char) -> Option<u16> {
        self.face().glyph_index(cp).map(|g| g.0)
    }

    fn advance_width(&self, glyph: u16) -> Option<u16> {
        self.face().glyph_hor_advance(GlyphId(glyph))
    }

    fn char_map(&self) -> Vec<(u32, u16)> {
        let face = self.face();
        let mut out = Vec::new();
        if let Some(cmap) = face.tables().cmap {
            for subtable in cmap.subtables {
                if !subtable.is_unicode() {
                    continue;
                }
                subtable.codepoints(|cp| {
                    if let Some(glyph) = subtable.glyph_index(cp) {
                        out.push((cp, glyph.0));
                    }
                });
            }
        }
        out.sort_unstable();
        out.dedup_by_key(|(cp, _)| *cp);
        out
    }

    fn subset(&self, _glyphs: &[u16]) -> Result<Vec<u8>> {
        // ttf-parser reads fonts but does not rebuild them; the subset
        // contract is "contains at least the requested glyphs", which the
        // full program satisfies. Kits wrapping a real subsetter prune.
        Ok(self.data.clone())
    }

    fn font_bytes(&self) -> &[u8] {
        &self.data
    }
}
