//! LZWDecode filter
//!
//! The TIFF/PDF LZW variant: variable 9..=12 bit codes, clear code 256,
//! end-of-data 257, and the "early change" quirk where the code width grows
//! one entry before the table is actually full.

use crate::error::{Error, ParseErrorKind, Result};

const CLEAR_CODE: u16 = 256;
const EOD_CODE: u16 = 257;
const FIRST_DYNAMIC: u16 = 258;
const MAX_CODE_WIDTH: u32 = 12;

pub fn decode(data: &[u8], early_change: bool) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len() * 3);
    let mut table: Vec<Vec<u8>> = Vec::new();
    reset_table(&mut table);

    let mut code_width: u32 = 9;
    let mut bit_pos: usize = 0;
    let mut prev: Option<u16> = None;
    let early = if early_change { 1 } else { 0 };

    loop {
        let Some(code) = read_code(data, &mut bit_pos, code_width) else {
            break;
        };
        match code {
            CLEAR_CODE => {
                reset_table(&mut table);
                code_width = 9;
                prev = None;
            }
            EOD_CODE => break,
            _ => {
                let entry = if (code as usize) < table.len() {
                    table[code as usize].clone()
                } else if let Some(prev_code) = prev {
                    // The KwKwK case: new code refers to the entry being built
                    let mut seq = table[prev_code as usize].clone();
                    seq.push(seq[0]);
                    seq
                } else {
                    return Err(Error::parse(bit_pos / 8, ParseErrorKind::UnsupportedFilter));
                };
                out.extend_from_slice(&entry);

                if let Some(prev_code) = prev {
                    let mut seq = table[prev_code as usize].clone();
                    seq.push(entry[0]);
                    table.push(seq);
                }
                prev = Some(code);

                if table.len() + early >= (1 << code_width) && code_width < MAX_CODE_WIDTH {
                    code_width += 1;
                }
            }
        }
    }
    Ok(out)
}

fn reset_table(table: &mut Vec<Vec<u8>>) {
    table.clear();
    for b in 0u16..FIRST_DYNAMIC {
        if b < 256 {
            table.push(vec![b as u8]);
        } else {
            table.push(Vec::new());
        }
    }
}

fn read_code(data: &[u8], bit_pos: &mut usize, width: u32) -> Option<u16> {
    let end = *bit_pos + width as usize;
    if end > data.len() * 8 {
        return None;
    }
    let mut value: u32 = 0;
    for _ in 0..width {
        let byte = data[*bit_pos / 8];
        let bit = (byte >> (7 - (*bit_pos % 8))) & 1;
        value = (value << 1) | bit as u32;
        *bit_pos += 1;
    }
    Some(value as u16)
}
