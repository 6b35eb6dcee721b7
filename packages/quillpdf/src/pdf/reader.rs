//! Document-level parsing
//!
//! Reconstructs the cross-reference table (classical `xref` or stream
//! form), follows `/Prev` update sections with later sections winning,
//! materializes every in-use object (inline or compressed inside an object
//! stream), and produces a fully populated [`Context`].

use crate::error::{Error, ParseErrorKind, Result};
use crate::pdf::context::{Context, Trailer};
use crate::pdf::filter;
use crate::pdf::lexer::Lexer;
use crate::pdf::object::{Dict, DictExt, Object, ObjRef};
use crate::pdf::parser::Parser;
use crate::pdf::xref::{self, FieldWidths, XrefEntry, XrefMap};
use std::collections::{BTreeMap, HashSet};

/// How many `/Prev` sections a file may chain before we give up.
const MAX_UPDATE_SECTIONS: usize = 1024;

/// How far from the ends of the buffer the header and trailer markers are
/// allowed to sit.
const HEADER_SCAN_WINDOW: usize = 1024;
const EOF_SCAN_WINDOW: usize = 2048;

/// Options for [`read_document`].
#[derive(Debug, Clone, Copy)]
pub struct ReadOptions {
    /// Objects parsed between cooperative yields; 0 never yields.
    pub objects_per_yield: u32,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            objects_per_yield: 0,
        }
    }
}

/// Parse speed presets for the yield knob.
pub mod parse_speeds {
    /// Never yield.
    pub const FASTEST: u32 = 0;
    pub const FAST: u32 = 1500;
    pub const MEDIUM: u32 = 500;
    pub const SLOW: u32 = 100;
}

/// Parse a PDF byte buffer into a populated context.
pub async fn read_document(data: &[u8], opts: &ReadOptions) -> Result<Context> {
    let reader = Reader { data };
    reader.check_header()?;
    let eof = reader.find_last_eof()?;
    let start = reader.find_startxref(eof)?;

    let (map, trailer) = reader.collect_xref_chain(start)?;

    let mut ctx = Context::new();
    *ctx.trailer_mut() = trailer;
    reader.materialize(&mut ctx, &map, opts).await?;
    reader.scan_dangling(&mut ctx);
    Ok(ctx)
}

struct Reader<'a> {
    data: &'a [u8],
}

impl<'a> Reader<'a> {
    fn check_header(&self) -> Result<()> {
        let window = &self.data[..self.data.len().min(HEADER_SCAN_WINDOW)];
        let Some(pos) = find(window, b"%PDF-") else {
            return Err(Error::invalid("missing %PDF- header"));
        };
        let version = window[pos + 5..]
            .iter()
            .take_while(|b| !Lexer::is_whitespace(**b))
            .map(|&b| b as char)
            .collect::<String>();
        log::debug!("PDF header version {}", version);
        Ok(())
    }

    fn find_last_eof(&self) -> Result<usize> {
        let scan_start = self.data.len().saturating_sub(EOF_SCAN_WINDOW);
        rfind(&self.data[scan_start..], b"%%EOF")
            .map(|pos| scan_start + pos)
            .ok_or_else(|| Error::parse(self.data.len(), ParseErrorKind::MissingEof))
    }

    fn find_startxref(&self, eof: usize) -> Result<usize> {
        let window = &self.data[..eof];
        let scan_start = window.len().saturating_sub(EOF_SCAN_WINDOW);
        let pos = rfind(&window[scan_start..], b"startxref")
            .map(|pos| scan_start + pos)
            .ok_or_else(|| Error::parse(eof, ParseErrorKind::BadXref))?;

        let mut parser = Parser::at(self.data, pos + b"startxref".len());
        let offset = parser
            .expect_int()
            .map_err(|_| Error::parse(pos, ParseErrorKind::BadXref))?;
        if offset < 0 || offset as usize >= self.data.len() {
            return Err(Error::parse(pos, ParseErrorKind::BadXref));
        }
        Ok(offset as usize)
    }

    /// Walk the `/Prev` chain newest-first, merging older sections under
    /// newer ones. A revisited offset means a cycle.
    fn collect_xref_chain(&self, start: usize) -> Result<(XrefMap, Trailer)> {
        let mut map = XrefMap::new();
        let mut trailer = Trailer::default();
        let mut visited: HashSet<usize> = HashSet::new();
        let mut next = Some(start);
        let mut first = true;

        while let Some(offset) = next {
            if !visited.insert(offset) || visited.len() > MAX_UPDATE_SECTIONS {
                return Err(Error::parse(offset, ParseErrorKind::DepthExceeded));
            }
            let section = self.read_xref_section(offset)?;
            xref::merge_older(&mut map, section.entries);
            if first {
                trailer = section.trailer;
                first = false;
            } else {
                trailer.merge_older(section.trailer);
            }
            next = section.prev;
        }
        Ok((map, trailer))
    }

    fn read_xref_section(&self, offset: usize) -> Result<XrefSection> {
        let mut probe = Lexer::at(self.data, offset);
        probe.skip_whitespace();
        if self.data[probe.pos()..].starts_with(b"xref") {
            self.read_classical_section(offset)
        } else {
            self.read_stream_section(offset)
        }
    }

    /// Classical `xref` table: subsection headers followed by fixed-width
    /// 20-byte entries, then `trailer` and its dictionary.
    fn read_classical_section(&self, offset: usize) -> Result<XrefSection> {
        let mut pos = offset;
        self.skip_ws(&mut pos);
        if !self.data[pos..].starts_with(b"xref") {
            return Err(Error::parse(pos, ParseErrorKind::BadXref));
        }
        pos += 4;

        let mut entries = XrefMap::new();
        loop {
            self.skip_ws(&mut pos);
            if self.data[pos..].starts_with(b"trailer") {
                pos += b"trailer".len();
                break;
            }
            let start = self.read_uint(&mut pos)?;
            self.skip_ws(&mut pos);
            let count = self.read_uint(&mut pos)?;

            for i in 0..count as u32 {
                self.skip_ws(&mut pos);
                // "nnnnnnnnnn ggggg n" is the first 18 bytes of each line
                if pos + 18 > self.data.len() {
                    return Err(Error::parse(pos, ParseErrorKind::BadXref));
                }
                let field1 = parse_decimal(&self.data[pos..pos + 10])
                    .ok_or_else(|| Error::parse(pos, ParseErrorKind::BadXref))?;
                let field2 = parse_decimal(&self.data[pos + 11..pos + 16])
                    .ok_or_else(|| Error::parse(pos, ParseErrorKind::BadXref))?;
                let kind = self.data[pos + 17];
                pos += 18;

                let num = start as u32 + i;
                let entry = match kind {
                    b'n' => XrefEntry::InUse {
                        offset: field1,
                        gen: field2 as u16,
                    },
                    b'f' => XrefEntry::Free {
                        next: field1 as u32,
                        gen: field2 as u16,
                    },
                    _ => return Err(Error::parse(pos, ParseErrorKind::BadXref)),
                };
                entries.entry(num).or_insert(entry);
            }
        }

        let mut parser = Parser::at(self.data, pos);
        let trailer_dict = match parser.parse_object()? {
            Object::Dict(d) => d,
            _ => return Err(Error::parse(pos, ParseErrorKind::BadXref)),
        };
        let prev = trailer_dict.get_int("Prev").map(|p| p as usize);
        Ok(XrefSection {
            entries,
            trailer: Trailer::read_from(&trailer_dict),
            prev,
        })
    }

    fn skip_ws(&self, pos: &mut usize) {
        while *pos < self.data.len() && Lexer::is_whitespace(self.data[*pos]) {
            *pos += 1;
        }
    }

    fn read_uint(&self, pos: &mut usize) -> Result<u64> {
        let start = *pos;
        while *pos < self.data.len() && self.data[*pos].is_ascii_digit() {
            *pos += 1;
        }
        parse_decimal(&self.data[start..*pos])
            .ok_or_else(|| Error::parse(start, ParseErrorKind::BadXref))
    }

    /// Cross-reference *stream* section: a stream object whose packed rows
    /// encode the entries.
    fn read_stream_section(&self, offset: usize) -> Result<XrefSection> {
        let (dict, data) = self.parse_stream_at(offset)?;
        if !dict.is_type("XRef") {
            return Err(Error::parse(offset, ParseErrorKind::BadXref));
        }

        let decoded = filter::decode_pipeline(&dict, &data)?;

        let w: Vec<usize> = dict
            .get_key("W")
            .and_then(Object::as_array)
            .map(|a| a.iter().filter_map(Object::as_int).map(|v| v as usize).collect())
            .unwrap_or_default();
        if w.len() != 3 {
            return Err(Error::parse(offset, ParseErrorKind::BadXref));
        }
        let widths = FieldWidths {
            w0: w[0],
            w1: w[1],
            w2: w[2],
        };

        let index: Vec<(u32, u32)> = dict
            .get_key("Index")
            .and_then(Object::as_array)
            .map(|a| {
                a.chunks(2)
                    .filter_map(|pair| match (pair.first(), pair.get(1)) {
                        (Some(a), Some(b)) => Some((a.as_int()? as u32, b.as_int()? as u32)),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default();

        let mut entries = XrefMap::new();
        for (num, entry) in xref::decode_entries(&decoded, widths, &index, offset)? {
            entries.entry(num).or_insert(entry);
        }

        let prev = dict.get_int("Prev").map(|p| p as usize);
        Ok(XrefSection {
            entries,
            trailer: Trailer::read_from(&dict),
            prev,
        })
    }

    /// Parse `num gen obj << >> stream ... endstream` at an offset and
    /// return the dict with the raw (still encoded) payload.
    fn parse_stream_at(&self, offset: usize) -> Result<(Dict, Vec<u8>)> {
        let mut parser = Parser::at(self.data, offset);
        parser.parse_object_header()?;
        let dict = match parser.parse_object()? {
            Object::Dict(d) => d,
            _ => return Err(Error::parse(offset, ParseErrorKind::BadObjectHeader)),
        };
        parser.expect_token(crate::pdf::lexer::Token::Stream)?;
        let start = parser.stream_data_start();
        let data = self.stream_payload(&dict, start, None)?;
        Ok((dict, data))
    }

    /// Slice a stream payload using `/Length`, falling back to an
    /// `endstream` scan when the length is indirect, missing, or wrong.
    fn stream_payload(
        &self,
        dict: &Dict,
        start: usize,
        map: Option<&XrefMap>,
    ) -> Result<Vec<u8>> {
        let length = match dict.get_key("Length") {
            Some(Object::Int(n)) if *n >= 0 => Some(*n as usize),
            Some(Object::Ref(r)) => map.and_then(|m| self.resolve_int_object(m, *r)),
            _ => None,
        };

        if let Some(len) = length {
            let end = start + len;
            if end <= self.data.len() && self.endstream_follows(end) {
                return Ok(self.data[start..end].to_vec());
            }
            log::warn!(
                "stream /Length {} at offset {} does not land on endstream; rescanning",
                len,
                start
            );
        }

        // Tolerant fallback: locate the closing keyword directly
        let rest = &self.data[start..];
        let end = find(rest, b"endstream")
            .ok_or_else(|| Error::parse(start, ParseErrorKind::BadStreamLength))?;
        let mut payload_end = start + end;
        // Drop the single EOL the writer put before "endstream"
        if payload_end > start && self.data[payload_end - 1] == b'\n' {
            payload_end -= 1;
        }
        if payload_end > start && self.data[payload_end - 1] == b'\r' {
            payload_end -= 1;
        }
        Ok(self.data[start..payload_end].to_vec())
    }

    fn endstream_follows(&self, mut pos: usize) -> bool {
        while pos < self.data.len() && Lexer::is_whitespace(self.data[pos]) {
            pos += 1;
        }
        self.data[pos..].starts_with(b"endstream")
    }

    /// Resolve an object that should be a bare integer (stream lengths).
    fn resolve_int_object(&self, map: &XrefMap, r: ObjRef) -> Option<usize> {
        match map.get(&r.num)? {
            XrefEntry::InUse { offset, .. } => {
                let mut parser = Parser::at(self.data, *offset as usize);
                parser.parse_object_header().ok()?;
                parser.parse_object().ok()?.as_int().map(|v| v as usize)
            }
            _ => None,
        }
    }

    async fn materialize(
        &self,
        ctx: &mut Context,
        map: &XrefMap,
        opts: &ReadOptions,
    ) -> Result<()> {
        let mut since_yield: u32 = 0;

        // Inline objects first; object streams depend on their hosts.
        let mut compressed: BTreeMap<u32, Vec<(u32, u32)>> = BTreeMap::new();
        for (&num, entry) in map {
            match entry {
                XrefEntry::Free { .. } => {}
                XrefEntry::InUse { offset, .. } => {
                    self.materialize_inline(ctx, map, num, *offset as usize)?;
                    self.tick(&mut since_yield, opts).await;
                }
                XrefEntry::InStream { host, index } => {
                    compressed.entry(*host).or_default().push((*index, num));
                }
            }
        }

        for (host, members) in compressed {
            self.materialize_compressed(ctx, host, &members)?;
            for _ in &members {
                self.tick(&mut since_yield, opts).await;
            }
        }
        Ok(())
    }

    fn materialize_inline(
        &self,
        ctx: &mut Context,
        map: &XrefMap,
        num: u32,
        offset: usize,
    ) -> Result<()> {
        if offset >= self.data.len() {
            log::warn!("xref offset {} for object {} out of bounds", offset, num);
            return Ok(());
        }
        let mut parser = Parser::at(self.data, offset);
        let header = parser.parse_object_header()?;
        if header.num != num {
            log::warn!(
                "object header {} at offset {} disagrees with xref entry {}",
                header.num,
                offset,
                num
            );
        }

        let value = parser.parse_object()?;
        let value = if parser.peek_token().ok() == Some(crate::pdf::lexer::Token::Stream) {
            let dict = match value {
                Object::Dict(d) => d,
                _ => return Err(Error::parse(offset, ParseErrorKind::BadObjectHeader)),
            };
            // Cross-reference streams are file plumbing, not document
            // content; the writer regenerates them.
            if dict.is_type("XRef") {
                return Ok(());
            }
            parser.next_token()?;
            let start = parser.stream_data_start();
            let data = self.stream_payload(&dict, start, Some(map))?;
            Object::Stream { dict, data }
        } else {
            // An indirect object whose body is itself a reference would
            // make lookup multi-hop; the chain is rejected here.
            if matches!(value, Object::Ref(_)) {
                return Err(Error::parse(offset, ParseErrorKind::BadObjectHeader));
            }
            value
        };

        ctx.insert_parsed(header, value);
        Ok(())
    }

    fn materialize_compressed(
        &self,
        ctx: &mut Context,
        host: u32,
        members: &[(u32, u32)],
    ) -> Result<()> {
        let host_ref = ObjRef::new(host, 0);
        let (n, first, decoded) = {
            let Some((dict, data)) = ctx.get(host_ref).and_then(Object::as_stream) else {
                log::warn!(
                    "object stream {} missing; skipping {} members",
                    host,
                    members.len()
                );
                return Ok(());
            };
            if !dict.is_type("ObjStm") {
                log::warn!("object {} is not an /ObjStm", host);
                return Ok(());
            }
            let n = dict.get_int("N").unwrap_or(0).max(0) as usize;
            let first = dict.get_int("First").unwrap_or(0).max(0) as usize;
            (n, first, filter::decode_pipeline(dict, data)?)
        };

        // Prelude: N pairs of (object number, offset relative to First)
        let mut prelude = Parser::new(&decoded);
        let mut pairs = Vec::with_capacity(n);
        for _ in 0..n {
            let num = prelude.expect_int()?;
            let rel = prelude.expect_int()?;
            pairs.push((num as u32, rel as usize));
        }

        for &(index, expected_num) in members {
            let Some(&(num, rel)) = pairs.get(index as usize) else {
                log::warn!(
                    "object stream {} has no index {} (wanted object {})",
                    host,
                    index,
                    expected_num
                );
                continue;
            };
            if num != expected_num {
                log::warn!(
                    "object stream {} index {} holds object {}, xref says {}",
                    host,
                    index,
                    num,
                    expected_num
                );
            }
            let at = first + rel;
            if at >= decoded.len() {
                return Err(Error::parse(at, ParseErrorKind::BadStreamLength));
            }
            let value = Parser::at(&decoded, at).parse_object()?;
            ctx.insert_parsed(ObjRef::new(num, 0), value);
        }

        // The host carried its members; keeping it would duplicate them
        // on the next save.
        ctx.discard(host_ref);
        Ok(())
    }

    fn scan_dangling(&self, ctx: &mut Context) {
        let mut refs = Vec::new();
        for (_, value) in ctx.iter() {
            Context::refs_in(value, &mut refs);
        }
        let missing: Vec<ObjRef> = refs
            .into_iter()
            .filter(|r| !ctx.contains(*r))
            .collect();
        if !missing.is_empty() {
            log::warn!(
                "{} dangling indirect reference(s); lookups will yield null",
                missing.len()
            );
        }
        for r in missing {
            ctx.note_dangling(r);
        }
    }

    async fn tick(&self, since_yield: &mut u32, opts: &ReadOptions) {
        if opts.objects_per_yield == 0 {
            return;
        }
        *since_yield += 1;
        if *since_yield >= opts.objects_per_yield {
            *since_yield = 0;
            tokio::task::yield_now().await;
        }
    }
}

struct XrefSection {
    entries: XrefMap,
    trailer: Trailer,
    prev: Option<usize>,
}

/// Parse ASCII digits (with optional surrounding spaces) as a decimal.
fn parse_decimal(bytes: &[u8]) -> Option<u64> {
    let trimmed: Vec<u8> = bytes
        .iter()
        .copied()
        .filter(|b| b.is_ascii_digit())
        .collect();
    if trimmed.is_empty() || trimmed.len() != bytes.iter().filter(|b| **b != b' ').count() {
        return None;
    }
    let mut value: u64 = 0;
    for b in trimmed {
        value = value.checked_mul(10)?.checked_add((b - b'0') as u64)?;
    }
    Some(value)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .rposition(|window| window == needle)
}
