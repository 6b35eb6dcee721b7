//! ASCIIHexDecode filter

use crate::error::{Error, ParseErrorKind, Result};

/// Decode hex pairs up to the `>` terminator; whitespace is ignored and a
/// trailing half byte is padded with 0.
pub fn decode(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len() / 2);
    let mut pending: Option<u8> = None;
    for (i, &ch) in data.iter().enumerate() {
        match ch {
            b'>' => break,
            b' ' | b'\t' | b'\r' | b'\n' | b'\x0C' | b'\0' => continue,
            _ => {
                let digit = match ch {
                    b'0'..=b'9' => ch - b'0',
                    b'a'..=b'f' => ch - b'a' + 10,
                    b'A'..=b'F' => ch - b'A' + 10,
                    _ => return Err(Error::parse(i, ParseErrorKind::UnsupportedFilter)),
                };
                match pending.take() {
                    Some(hi) => out.push(hi << 4 | digit),
                    None => pending = Some(digit),
                }
            }
        }
    }
    if let Some(hi) = pending {
        out.push(hi << 4);
    }
    Ok(out)
}
