//! Standard-14 font embedder
//!
//! The fourteen faces every PDF reader ships. No font program is
//! embedded: the dictionary names the face and the bundled AFM widths
//! answer metric queries.

use crate::embed::{metrics, Embedder};
use crate::error::Result;
use crate::pdf::context::Context;
use crate::pdf::object::{Object, ObjRef};

/// The standard 14 PostScript faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardFont {
    Courier,
    CourierBold,
    CourierOblique,
    CourierBoldOblique,
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
    HelveticaBoldOblique,
    TimesRoman,
    TimesBold,
    TimesItalic,
    TimesBoldItalic,
    Symbol,
    ZapfDingbats,
}

impl StandardFont {
    pub const ALL: [StandardFont; 14] = [
        StandardFont::Courier,
        StandardFont::CourierBold,
        StandardFont::CourierOblique,
        StandardFont::CourierBoldOblique,
        StandardFont::Helvetica,
        StandardFont::HelveticaBold,
        StandardFont::HelveticaOblique,
        StandardFont::HelveticaBoldOblique,
        StandardFont::TimesRoman,
        StandardFont::TimesBold,
        StandardFont::TimesItalic,
        StandardFont::TimesBoldItalic,
        StandardFont::Symbol,
        StandardFont::ZapfDingbats,
    ];

    /// The PostScript name, which is also the `/BaseFont` value.
    pub fn postscript_name(self) -> &'static str {
        match self {
            StandardFont::Courier => "Courier",
            StandardFont::CourierBold => "Courier-Bold",
            StandardFont::CourierOblique => "Courier-Oblique",
            StandardFont::CourierBoldOblique => "Courier-BoldOblique",
            StandardFont::Helvetica => "Helvetica",
            StandardFont::HelveticaBold => "Helvetica-Bold",
            StandardFont::HelveticaOblique => "Helvetica-Oblique",
            StandardFont::HelveticaBoldOblique => "Helvetica-BoldOblique",
            StandardFont::TimesRoman => "Times-Roman",
            StandardFont::TimesBold => "Times-Bold",
            StandardFont::TimesItalic => "Times-Italic",
            StandardFont::TimesBoldItalic => "Times-BoldItalic",
            StandardFont::Symbol => "Symbol",
            StandardFont::ZapfDingbats => "ZapfDingbats",
        }
    }

    /// Exact-name lookup, the dispatch test for string font inputs.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.postscript_name() == name)
    }

    /// The symbolic faces carry their own encodings instead of WinAnsi.
    pub fn is_symbolic(self) -> bool {
        matches!(self, StandardFont::Symbol | StandardFont::ZapfDingbats)
    }

    /// Width of a string at a font size, from the AFM widths.
    pub fn width_of(self, text: &str, size: f64) -> f64 {
        let units: u32 = text
            .chars()
            .map(|ch| {
                let code = if ch.is_ascii() { ch as u8 } else { 0 };
                metrics::advance(self, code) as u32
            })
            .sum();
        units as f64 * size / 1000.0
    }

    /// Line height at a font size, from ascender and descender.
    pub fn height_at(self, size: f64) -> f64 {
        let (ascent, descent) = metrics::vertical(self);
        (ascent as i32 - descent as i32) as f64 * size / 1000.0
    }
}

/// Embedder producing the `/Type1` font dictionary.
pub struct StandardFontEmbedder {
    pub face: StandardFont,
}

impl StandardFontEmbedder {
    pub fn new(face: StandardFont) -> Self {
        Self { face }
    }
}

impl Embedder for StandardFontEmbedder {
    fn embed_into(&self, ctx: &mut Context, target: ObjRef) -> Result<()> {
        let mut dict = crate::dict! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => self.face.postscript_name(),
        };
        if !self.face.is_symbolic() {
            use crate::pdf::object::DictExt;
            dict.set("Encoding", "WinAnsiEncoding");
        }
        ctx.assign(target, Object::Dict(dict));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::object::DictExt;

    #[test]
    fn test_from_name_roundtrip() {
        for face in StandardFont::ALL {
            assert_eq!(StandardFont::from_name(face.postscript_name()), Some(face));
        }
        assert_eq!(StandardFont::from_name("Arial"), None);
    }

    #[test]
    fn test_embed_produces_type1_dict() {
        let mut ctx = Context::new();
        let target = ctx.next_ref();
        StandardFontEmbedder::new(StandardFont::Helvetica)
            .embed_into(&mut ctx, target)
            .unwrap();
        let dict = ctx.dict_at(target).unwrap();
        assert!(dict.is_type("Font"));
        assert_eq!(dict.get_name("Subtype").unwrap().as_str(), "Type1");
        assert_eq!(dict.get_name("BaseFont").unwrap().as_str(), "Helvetica");
        assert_eq!(dict.get_name("Encoding").unwrap().as_str(), "WinAnsiEncoding");
    }

    #[test]
    fn test_symbolic_face_skips_winansi() {
        let mut ctx = Context::new();
        let target = ctx.next_ref();
        StandardFontEmbedder::new(StandardFont::ZapfDingbats)
            .embed_into(&mut ctx, target)
            .unwrap();
        let dict = ctx.dict_at(target).unwrap();
        assert!(dict.get_key("Encoding").is_none());
    }

    #[test]
    fn test_width_of_hello() {
        // H(722) + e(556) + l(222) + l(222) + o(556) = 2278 units
        let w = StandardFont::Helvetica.width_of("Hello", 12.0);
        assert!((w - 2278.0 * 12.0 / 1000.0).abs() < 1e-9);
    }

    #[test]
    fn test_height_at_size() {
        let h = StandardFont::Helvetica.height_at(10.0);
        assert!((h - 9.25).abs() < 1e-9); // (718 + 207) / 100
    }
}
