//! Serialization to PDF bytes
//!
//! Two modes share one value serializer: the classical mode emits every
//! object inline with an `xref` table, the object-stream mode packs
//! eligible objects into `/ObjStm` streams indexed by a cross-reference
//! stream. Offsets are tracked as bytes are emitted; stream `/Length`
//! entries are rewritten from the actual buffer.

pub mod classic;
pub mod objstm;

use crate::pdf::object::{Dict, DictExt, Name, Object, ObjRef, PdfString, StringKind};

/// Options for `Document::save`.
#[derive(Debug, Clone, Copy)]
pub struct SaveOptions {
    /// Pack objects into object streams with an xref stream (PDF 1.5+).
    pub use_object_streams: bool,
    /// Add one blank A4 page when saving an empty document.
    pub add_default_page: bool,
    /// Objects emitted between cooperative yields, and the object-stream
    /// group size.
    pub objects_per_tick: u32,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            use_object_streams: true,
            add_default_page: true,
            objects_per_tick: 50,
        }
    }
}

pub(crate) const HEADER: &[u8] = b"%PDF-1.7\n%\xE2\xE3\xCF\xD3\n";

/// Serialize one value.
pub(crate) fn write_value(out: &mut Vec<u8>, value: &Object) {
    match value {
        Object::Null => out.extend_from_slice(b"null"),
        Object::Bool(true) => out.extend_from_slice(b"true"),
        Object::Bool(false) => out.extend_from_slice(b"false"),
        Object::Int(i) => out.extend_from_slice(i.to_string().as_bytes()),
        Object::Real(r) => out.extend_from_slice(format_real(*r).as_bytes()),
        Object::String(s) => write_string(out, s),
        Object::Name(n) => write_name(out, n),
        Object::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b' ');
                }
                write_value(out, item);
            }
            out.push(b']');
        }
        Object::Dict(dict) => write_dict(out, dict),
        Object::Stream { dict, data } => {
            // /Length is authoritative from the buffer at write time
            let mut dict = dict.clone();
            dict.set("Length", data.len());
            write_dict(out, &dict);
            out.extend_from_slice(b"\nstream\n");
            out.extend_from_slice(data);
            out.extend_from_slice(b"\nendstream");
        }
        Object::Ref(r) => {
            out.extend_from_slice(format!("{} {} R", r.num, r.gen).as_bytes());
        }
    }
}

/// Serialize `num gen obj <value> endobj`.
pub(crate) fn write_indirect(out: &mut Vec<u8>, r: ObjRef, value: &Object) {
    out.extend_from_slice(format!("{} {} obj\n", r.num, r.gen).as_bytes());
    write_value(out, value);
    out.extend_from_slice(b"\nendobj\n");
}

fn write_dict(out: &mut Vec<u8>, dict: &Dict) {
    out.extend_from_slice(b"<<");
    for (key, value) in dict {
        out.push(b' ');
        write_name(out, key);
        out.push(b' ');
        write_value(out, value);
    }
    out.extend_from_slice(b" >>");
}

/// Names escape bytes outside the regular character range as `#xx`.
fn write_name(out: &mut Vec<u8>, name: &Name) {
    out.push(b'/');
    for ch in name.as_str().chars() {
        let byte = (ch as u32) as u8;
        let regular = (0x21..=0x7E).contains(&byte)
            && !matches!(
                byte,
                b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%' | b'#'
            );
        if regular {
            out.push(byte);
        } else {
            out.extend_from_slice(format!("#{:02X}", byte).as_bytes());
        }
    }
}

fn write_string(out: &mut Vec<u8>, s: &PdfString) {
    match s.kind() {
        StringKind::Hex => {
            out.push(b'<');
            for byte in s.as_bytes() {
                out.extend_from_slice(format!("{:02X}", byte).as_bytes());
            }
            out.push(b'>');
        }
        StringKind::Literal => {
            out.push(b'(');
            for &byte in s.as_bytes() {
                match byte {
                    b'(' | b')' | b'\\' => {
                        out.push(b'\\');
                        out.push(byte);
                    }
                    b'\n' => out.extend_from_slice(b"\\n"),
                    b'\r' => out.extend_from_slice(b"\\r"),
                    b'\t' => out.extend_from_slice(b"\\t"),
                    0x08 => out.extend_from_slice(b"\\b"),
                    0x0C => out.extend_from_slice(b"\\f"),
                    0x20..=0x7E => out.push(byte),
                    _ => out.extend_from_slice(format!("\\{:03o}", byte).as_bytes()),
                }
            }
            out.push(b')');
        }
    }
}

/// Reals print with at most five fractional digits, trailing zeros
/// trimmed, never in scientific notation.
pub(crate) fn format_real(x: f64) -> String {
    if !x.is_finite() {
        return "0".to_string();
    }
    let mut s = format!("{:.5}", x);
    if s.contains('.') {
        while s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.pop();
        }
    }
    if s == "-0" {
        s = "0".to_string();
    }
    s
}
