//! Custom font embedder
//!
//! Produces a `/Type0` composite font: a CIDFontType2 (TrueType) or
//! CIDFontType0 (CFF) descendant with the font program in its descriptor,
//! CID widths, and a `/ToUnicode` CMap for text extraction. Glyph ids are
//! used directly as CIDs via `/Identity-H`. The subset variant asks the
//! fontkit for a reduced program covering the glyphs seen so far and tags
//! the base name with a six-letter prefix.

use crate::embed::fontkit::FontFace;
use crate::embed::Embedder;
use crate::error::Result;
use crate::pdf::context::Context;
use crate::pdf::object::{DictExt, Name, Object, ObjRef, PdfString, StringKind};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

pub struct CustomFontEmbedder {
    face: Arc<dyn FontFace>,
    subset: bool,
    /// Codepoints observed by text drawing since the last flush; only
    /// consulted when subsetting.
    used: Arc<Mutex<BTreeSet<char>>>,
}

impl CustomFontEmbedder {
    pub fn new(face: Arc<dyn FontFace>, subset: bool, used: Arc<Mutex<BTreeSet<char>>>) -> Self {
        Self { face, subset, used }
    }

    fn base_name(&self) -> String {
        self.face
            .postscript_name()
            .unwrap_or_else(|| "Embedded".to_string())
    }

    /// Glyphs the embedded program must cover; `.notdef` always rides
    /// along.
    fn used_glyphs(&self) -> Vec<u16> {
        let used = self.used.lock().expect("used-glyph set");
        let mut glyphs: BTreeSet<u16> = used
            .iter()
            .filter_map(|&cp| self.face.glyph_for_codepoint(cp))
            .collect();
        glyphs.insert(0);
        glyphs.into_iter().collect()
    }

    /// Design-unit value scaled to the 1000-unit glyph space.
    fn scaled(&self, value: i32) -> i64 {
        let upem = self.face.units_per_em().max(1) as f64;
        (value as f64 * 1000.0 / upem).round() as i64
    }

    fn descriptor_flags(&self) -> i64 {
        // Symbolic (bit 3) is the honest choice for an Identity-H CID
        // font; fixed pitch is bit 1.
        let mut flags = 1 << 2;
        if self.face.is_fixed_pitch() {
            flags |= 1;
        }
        flags
    }

    /// `/W` array: runs of consecutive glyph ids sharing one widths list.
    fn width_runs(&self, glyphs: &[(u32, u16)]) -> Vec<Object> {
        let mut gids: Vec<u16> = glyphs.iter().map(|(_, g)| *g).collect();
        gids.sort_unstable();
        gids.dedup();

        let mut out = Vec::new();
        let mut i = 0usize;
        while i < gids.len() {
            let start = gids[i];
            let mut widths = Vec::new();
            let mut j = i;
            while j < gids.len() && gids[j] == start + (j - i) as u16 {
                let w = self.face.advance_width(gids[j]).unwrap_or(0);
                widths.push(Object::Int(self.scaled(w as i32)));
                j += 1;
            }
            out.push(Object::Int(start as i64));
            out.push(Object::Array(widths));
            i = j;
        }
        out
    }

    /// The `/ToUnicode` CMap body mapping glyph ids to UTF-16BE text.
    fn to_unicode_cmap(&self, pairs: &[(u32, u16)]) -> Vec<u8> {
        let mut body = String::new();
        body.push_str(
            "/CIDInit /ProcSet findresource begin\n\
             12 dict begin\n\
             begincmap\n\
             /CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n\
             /CMapName /Adobe-Identity-UCS def\n\
             /CMapType 2 def\n\
             1 begincodespacerange\n<0000> <ffff>\nendcodespacerange\n",
        );
        for chunk in pairs.chunks(100) {
            body.push_str(&format!("{} beginbfchar\n", chunk.len()));
            for &(cp, gid) in chunk {
                let ch = char::from_u32(cp).unwrap_or('\u{FFFD}');
                let mut units = [0u16; 2];
                let encoded = ch.encode_utf16(&mut units);
                body.push_str(&format!("<{:04x}> <", gid));
                for unit in encoded {
                    body.push_str(&format!("{:04x}", unit));
                }
                body.push_str(">\n");
            }
            body.push_str("endbfchar\n");
        }
        body.push_str("endcmap\nCMapName currentdict /CMap defineresource pop\nend\nend\n");
        body.into_bytes()
    }

    /// Six uppercase letters derived from the name and glyph selection,
    /// stable across runs for reproducible output.
    fn subset_tag(&self, glyphs: &[u16]) -> String {
        let mut hash: u64 = 0xcbf29ce484222325;
        for b in self.base_name().bytes() {
            hash = (hash ^ b as u64).wrapping_mul(0x100000001b3);
        }
        for g in glyphs {
            hash = (hash ^ *g as u64).wrapping_mul(0x100000001b3);
        }
        (0..6)
            .map(|i| {
                let v = ((hash >> (i * 8)) & 0xFF) % 26;
                (b'A' + v as u8) as char
            })
            .collect()
    }
}

impl Embedder for CustomFontEmbedder {
    fn embed_into(&self, ctx: &mut Context, target: ObjRef) -> Result<()> {
        let program: Vec<u8>;
        let base_font: String;
        let char_map: Vec<(u32, u16)>;

        if self.subset {
            let glyphs = self.used_glyphs();
            program = self.face.subset(&glyphs)?;
            base_font = format!("{}+{}", self.subset_tag(&glyphs), self.base_name());
            let kept: BTreeSet<u16> = glyphs.into_iter().collect();
            char_map = self
                .face
                .char_map()
                .into_iter()
                .filter(|(_, g)| kept.contains(g))
                .collect();
        } else {
            program = self.face.font_bytes().to_vec();
            base_font = self.base_name();
            char_map = self.face.char_map();
        }

        // Font program stream
        let mut file_dict = crate::dict! { "Length" => program.len() };
        let file_key = if self.face.is_cff() {
            file_dict.set("Subtype", "OpenType");
            "FontFile3"
        } else {
            file_dict.set("Length1", program.len());
            "FontFile2"
        };
        let file_ref = ctx.register(Object::Stream {
            dict: file_dict,
            data: program,
        });

        // Font descriptor
        let bbox = self.face.bbox();
        let mut descriptor = crate::dict! {
            "Type" => "FontDescriptor",
            "FontName" => Name::from_string(base_font.clone()),
            "Flags" => self.descriptor_flags(),
            "FontBBox" => vec![
                Object::Int(self.scaled(bbox[0] as i32)),
                Object::Int(self.scaled(bbox[1] as i32)),
                Object::Int(self.scaled(bbox[2] as i32)),
                Object::Int(self.scaled(bbox[3] as i32)),
            ],
            "ItalicAngle" => self.face.italic_angle(),
            "Ascent" => self.scaled(self.face.ascent() as i32),
            "Descent" => self.scaled(self.face.descent() as i32),
            "CapHeight" => self.scaled(
                self.face.cap_height().unwrap_or(self.face.ascent()) as i32
            ),
            "StemV" => 80,
        };
        descriptor.set(file_key, file_ref);
        let descriptor_ref = ctx.register(Object::Dict(descriptor));

        // Descendant CID font
        let subtype = if self.face.is_cff() {
            "CIDFontType0"
        } else {
            "CIDFontType2"
        };
        let mut cid_font = crate::dict! {
            "Type" => "Font",
            "Subtype" => subtype,
            "BaseFont" => Name::from_string(base_font.clone()),
            "CIDSystemInfo" => crate::dict! {
                "Registry" => PdfString::new(b"Adobe".to_vec(), StringKind::Literal),
                "Ordering" => PdfString::new(b"Identity".to_vec(), StringKind::Literal),
                "Supplement" => 0,
            },
            "FontDescriptor" => descriptor_ref,
            "DW" => 1000,
            "W" => self.width_runs(&char_map),
        };
        if !self.face.is_cff() {
            cid_font.set("CIDToGIDMap", "Identity");
        }
        let cid_ref = ctx.register(Object::Dict(cid_font));

        // ToUnicode CMap
        let cmap = self.to_unicode_cmap(&char_map);
        let cmap_ref = ctx.register(Object::Stream {
            dict: crate::dict! { "Length" => cmap.len() },
            data: cmap,
        });

        // Composite font at the reserved ref
        ctx.assign(
            target,
            Object::Dict(crate::dict! {
                "Type" => "Font",
                "Subtype" => "Type0",
                "BaseFont" => Name::from_string(base_font),
                "Encoding" => "Identity-H",
                "DescendantFonts" => vec![Object::Ref(cid_ref)],
                "ToUnicode" => cmap_ref,
            }),
        );
        Ok(())
    }
}
