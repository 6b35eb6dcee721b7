//! ASCII85Decode filter

use crate::error::{Error, ParseErrorKind, Result};

/// Decode base-85 groups up to the `~>` terminator. `z` is the shorthand
/// for four zero bytes; partial final groups emit `n - 1` bytes.
pub fn decode(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len() * 4 / 5);
    let mut group = [0u8; 5];
    let mut filled = 0usize;

    let mut iter = data.iter().enumerate().peekable();
    while let Some((i, &ch)) = iter.next() {
        match ch {
            b'~' => break,
            b' ' | b'\t' | b'\r' | b'\n' | b'\x0C' | b'\0' => continue,
            b'z' if filled == 0 => out.extend_from_slice(&[0, 0, 0, 0]),
            b'!'..=b'u' => {
                group[filled] = ch - b'!';
                filled += 1;
                if filled == 5 {
                    push_group(&mut out, &group, 5);
                    filled = 0;
                }
            }
            _ => return Err(Error::parse(i, ParseErrorKind::UnsupportedFilter)),
        }
    }

    match filled {
        0 => {}
        1 => return Err(Error::parse(data.len(), ParseErrorKind::UnsupportedFilter)),
        n => {
            // Pad with 'u' and drop the padding bytes from the output
            for slot in group.iter_mut().skip(n) {
                *slot = 84;
            }
            push_group(&mut out, &group, n);
        }
    }
    Ok(out)
}

fn push_group(out: &mut Vec<u8>, group: &[u8; 5], filled: usize) {
    let mut value: u32 = 0;
    for &digit in group {
        value = value.wrapping_mul(85).wrapping_add(digit as u32);
    }
    let bytes = value.to_be_bytes();
    out.extend_from_slice(&bytes[..filled - 1]);
}
