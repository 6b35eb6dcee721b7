//! RunLengthDecode filter

use crate::error::{Error, ParseErrorKind, Result};

/// Decode run-length data: length byte `< 128` copies `length + 1` literal
/// bytes, `> 128` repeats the next byte `257 - length` times, `128` ends.
pub fn decode(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len() * 2);
    let mut pos = 0usize;
    while pos < data.len() {
        let length = data[pos];
        pos += 1;
        match length {
            128 => break,
            0..=127 => {
                let count = length as usize + 1;
                if pos + count > data.len() {
                    return Err(Error::parse(pos, ParseErrorKind::UnsupportedFilter));
                }
                out.extend_from_slice(&data[pos..pos + count]);
                pos += count;
            }
            _ => {
                if pos >= data.len() {
                    return Err(Error::parse(pos, ParseErrorKind::UnsupportedFilter));
                }
                let count = 257 - length as usize;
                out.extend(std::iter::repeat(data[pos]).take(count));
                pos += 1;
            }
        }
    }
    Ok(out)
}
