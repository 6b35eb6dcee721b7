//! Cross-reference table model
//!
//! Entries map object numbers to byte offsets (classical form) or to a
//! coordinate inside an object stream (compressed form). The same model
//! backs the reader and both writer modes; the packed binary form used by
//! xref *streams* is encoded and decoded here as well.

use crate::error::{Error, ParseErrorKind, Result};
use std::collections::BTreeMap;

/// One cross-reference entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XrefEntry {
    /// Type 0: released number; `next` is the next free object number.
    Free { next: u32, gen: u16 },
    /// Type 1: object stored inline at a byte offset.
    InUse { offset: u64, gen: u16 },
    /// Type 2: object compressed inside object stream `host` at `index`.
    InStream { host: u32, index: u32 },
}

impl XrefEntry {
    pub fn is_in_use(&self) -> bool {
        !matches!(self, XrefEntry::Free { .. })
    }
}

/// Object number → entry, latest update section winning.
pub type XrefMap = BTreeMap<u32, XrefEntry>;

/// Merge an older section under a newer one: existing entries win.
pub fn merge_older(map: &mut XrefMap, older: XrefMap) {
    for (num, entry) in older {
        map.entry(num).or_insert(entry);
    }
}

/// Field widths for the packed `(type, field2, field3)` tuples of an xref
/// stream, the `/W` array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldWidths {
    pub w0: usize,
    pub w1: usize,
    pub w2: usize,
}

impl FieldWidths {
    pub fn entry_width(&self) -> usize {
        self.w0 + self.w1 + self.w2
    }

    /// Smallest widths that fit every entry; the type field always takes
    /// one byte.
    pub fn minimal_for(entries: &[(u32, XrefEntry)]) -> Self {
        let mut max2: u64 = 0;
        let mut max3: u64 = 0;
        for (_, entry) in entries {
            let (f2, f3) = fields_of(entry);
            max2 = max2.max(f2);
            max3 = max3.max(f3);
        }
        Self {
            w0: 1,
            w1: bytes_needed(max2),
            w2: bytes_needed(max3),
        }
    }
}

fn fields_of(entry: &XrefEntry) -> (u64, u64) {
    match entry {
        XrefEntry::Free { next, gen } => (*next as u64, *gen as u64),
        XrefEntry::InUse { offset, gen } => (*offset, *gen as u64),
        XrefEntry::InStream { host, index } => (*host as u64, *index as u64),
    }
}

fn bytes_needed(value: u64) -> usize {
    if value == 0 {
        1
    } else {
        (64 - value.leading_zeros() as usize).div_ceil(8)
    }
}

fn read_uint(data: &[u8]) -> u64 {
    data.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64)
}

fn write_uint(out: &mut Vec<u8>, value: u64, width: usize) {
    for i in (0..width).rev() {
        out.push((value >> (i * 8)) as u8);
    }
}

/// Encode entries into the packed row format of an xref stream.
pub fn encode_entries(entries: &[(u32, XrefEntry)], w: FieldWidths) -> Vec<u8> {
    let mut out = Vec::with_capacity(entries.len() * w.entry_width());
    for (_, entry) in entries {
        let type_field = match entry {
            XrefEntry::Free { .. } => 0u64,
            XrefEntry::InUse { .. } => 1,
            XrefEntry::InStream { .. } => 2,
        };
        let (f2, f3) = fields_of(entry);
        write_uint(&mut out, type_field, w.w0);
        write_uint(&mut out, f2, w.w1);
        write_uint(&mut out, f3, w.w2);
    }
    out
}

/// Decode packed rows back into entries, numbering them from the `/Index`
/// ranges (`(start, count)` pairs; empty means one range from 0).
pub fn decode_entries(
    data: &[u8],
    w: FieldWidths,
    index: &[(u32, u32)],
    error_offset: usize,
) -> Result<Vec<(u32, XrefEntry)>> {
    let width = w.entry_width();
    if width == 0 || data.len() % width != 0 {
        return Err(Error::parse(error_offset, ParseErrorKind::BadXref));
    }
    let available = data.len() / width;

    let default_range;
    let ranges: &[(u32, u32)] = if index.is_empty() {
        default_range = [(0u32, available as u32)];
        &default_range
    } else {
        index
    };

    let mut entries = Vec::with_capacity(available);
    let mut pos = 0usize;
    for &(start, count) in ranges {
        for i in 0..count {
            if pos + width > data.len() {
                return Err(Error::parse(error_offset, ParseErrorKind::BadXref));
            }
            let row = &data[pos..pos + width];
            pos += width;
            // A zero-width type field defaults to type 1 per the standard
            let type_field = if w.w0 > 0 { read_uint(&row[..w.w0]) } else { 1 };
            let f2 = read_uint(&row[w.w0..w.w0 + w.w1]);
            let f3 = read_uint(&row[w.w0 + w.w1..]);
            let entry = match type_field {
                0 => XrefEntry::Free {
                    next: f2 as u32,
                    gen: f3 as u16,
                },
                1 => XrefEntry::InUse {
                    offset: f2,
                    gen: f3 as u16,
                },
                2 => XrefEntry::InStream {
                    host: f2 as u32,
                    index: f3 as u32,
                },
                _ => return Err(Error::parse(error_offset, ParseErrorKind::BadXref)),
            };
            entries.push((start + i, entry));
        }
    }
    Ok(entries)
}

/// Collapse sorted object numbers into `/Index`-style `(start, count)`
/// ranges of consecutive numbers.
pub fn index_ranges(entries: &[(u32, XrefEntry)]) -> Vec<(u32, u32)> {
    let mut ranges = Vec::new();
    let mut iter = entries.iter().map(|(num, _)| *num);
    let Some(first) = iter.next() else {
        return ranges;
    };
    let mut start = first;
    let mut count = 1u32;
    let mut prev = first;
    for num in iter {
        if num == prev + 1 {
            count += 1;
        } else {
            ranges.push((start, count));
            start = num;
            count = 1;
        }
        prev = num;
    }
    ranges.push((start, count));
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_older_keeps_newer() {
        let mut newer = XrefMap::new();
        newer.insert(1, XrefEntry::InUse { offset: 100, gen: 0 });
        let mut older = XrefMap::new();
        older.insert(1, XrefEntry::InUse { offset: 999, gen: 0 });
        older.insert(2, XrefEntry::InUse { offset: 200, gen: 0 });
        merge_older(&mut newer, older);
        assert_eq!(newer[&1], XrefEntry::InUse { offset: 100, gen: 0 });
        assert_eq!(newer[&2], XrefEntry::InUse { offset: 200, gen: 0 });
    }

    #[test]
    fn test_minimal_widths() {
        let entries = vec![
            (0, XrefEntry::Free { next: 0, gen: 0xFFFF }),
            (1, XrefEntry::InUse { offset: 0x1_0000, gen: 0 }),
        ];
        let w = FieldWidths::minimal_for(&entries);
        assert_eq!(w.w0, 1);
        assert_eq!(w.w1, 3); // 0x10000 needs 3 bytes
        assert_eq!(w.w2, 2); // 0xFFFF needs 2 bytes
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let entries = vec![
            (0, XrefEntry::Free { next: 0, gen: 0xFFFF }),
            (1, XrefEntry::InUse { offset: 15, gen: 0 }),
            (2, XrefEntry::InUse { offset: 512, gen: 0 }),
            (3, XrefEntry::InStream { host: 7, index: 0 }),
            (4, XrefEntry::InStream { host: 7, index: 1 }),
        ];
        let w = FieldWidths::minimal_for(&entries);
        let packed = encode_entries(&entries, w);
        assert_eq!(packed.len(), entries.len() * w.entry_width());

        let index = index_ranges(&entries);
        let decoded = decode_entries(&packed, w, &index, 0).unwrap();
        assert_eq!(decoded, entries);
    }

    #[test]
    fn test_index_ranges_split_on_gap() {
        let entries = vec![
            (0, XrefEntry::Free { next: 0, gen: 0xFFFF }),
            (1, XrefEntry::InUse { offset: 1, gen: 0 }),
            (2, XrefEntry::InUse { offset: 2, gen: 0 }),
            (5, XrefEntry::InUse { offset: 5, gen: 0 }),
            (6, XrefEntry::InUse { offset: 6, gen: 0 }),
        ];
        assert_eq!(index_ranges(&entries), vec![(0, 3), (5, 2)]);
    }

    #[test]
    fn test_decode_rejects_ragged_data() {
        let w = FieldWidths { w0: 1, w1: 2, w2: 1 };
        assert!(decode_entries(&[0u8; 5], w, &[], 0).is_err());
    }

    #[test]
    fn test_decode_zero_width_type_defaults_to_in_use() {
        let w = FieldWidths { w0: 0, w1: 2, w2: 1 };
        let data = [0x01, 0x00, 0x00];
        let decoded = decode_entries(&data, w, &[], 0).unwrap();
        assert_eq!(decoded, vec![(0, XrefEntry::InUse { offset: 256, gen: 0 })]);
    }
}
