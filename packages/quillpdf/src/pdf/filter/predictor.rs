//! PNG/TIFF predictor transforms
//!
//! Predictor 2 is TIFF horizontal differencing; 10..=15 are the PNG row
//! filters, each row prefixed with its filter-type byte. Decoding is needed
//! for xref streams and PNG image data; encoding is needed when the writer
//! emits its own predicted xref stream.

use crate::error::{Error, ParseErrorKind, Result};
use crate::pdf::filter::params::DecodeParams;

/// Undo the predictor named by `params` on decompressed data.
pub fn decode(data: &[u8], params: &DecodeParams) -> Result<Vec<u8>> {
    match params.predictor {
        1 => Ok(data.to_vec()),
        2 => Ok(tiff_decode(data, params.bytes_per_row(), params.bytes_per_pixel())),
        10..=15 => png_decode(data, params.bytes_per_row(), params.bytes_per_pixel()),
        _ => Err(Error::parse(0, ParseErrorKind::UnsupportedFilter)),
    }
}

fn tiff_decode(data: &[u8], bytes_per_row: usize, bytes_per_pixel: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    for row in data.chunks(bytes_per_row.max(1)) {
        let row_start = out.len();
        for (i, &byte) in row.iter().enumerate() {
            let left = if i >= bytes_per_pixel {
                out[row_start + i - bytes_per_pixel]
            } else {
                0
            };
            out.push(byte.wrapping_add(left));
        }
    }
    out
}

/// Undo PNG row filters; every row carries a leading filter-type byte.
pub fn png_decode(data: &[u8], bytes_per_row: usize, bytes_per_pixel: usize) -> Result<Vec<u8>> {
    let row_size = bytes_per_row + 1;
    let mut out = Vec::with_capacity(data.len());
    let mut prev_row = vec![0u8; bytes_per_row];

    for row_data in data.chunks(row_size) {
        if row_data.is_empty() {
            continue;
        }
        let filter_type = row_data[0];
        let mut row = row_data[1..].to_vec();
        row.resize(bytes_per_row, 0);
        decode_row(filter_type, &row, &prev_row, bytes_per_pixel, &mut out)?;
        let start = out.len() - bytes_per_row;
        prev_row.copy_from_slice(&out[start..]);
    }
    Ok(out)
}

fn decode_row(
    filter_type: u8,
    row: &[u8],
    prev_row: &[u8],
    bpp: usize,
    out: &mut Vec<u8>,
) -> Result<()> {
    let start = out.len();
    match filter_type {
        0 => out.extend_from_slice(row),
        1 => {
            for (i, &byte) in row.iter().enumerate() {
                let left = if i >= bpp { out[start + i - bpp] } else { 0 };
                out.push(byte.wrapping_add(left));
            }
        }
        2 => {
            for (i, &byte) in row.iter().enumerate() {
                out.push(byte.wrapping_add(prev_row[i]));
            }
        }
        3 => {
            for (i, &byte) in row.iter().enumerate() {
                let left = if i >= bpp { out[start + i - bpp] as u16 } else { 0 };
                let up = prev_row[i] as u16;
                out.push(byte.wrapping_add(((left + up) / 2) as u8));
            }
        }
        4 => {
            for (i, &byte) in row.iter().enumerate() {
                let left = if i >= bpp { out[start + i - bpp] } else { 0 };
                let up = prev_row[i];
                let up_left = if i >= bpp { prev_row[i - bpp] } else { 0 };
                out.push(byte.wrapping_add(paeth(left, up, up_left)));
            }
        }
        _ => return Err(Error::parse(0, ParseErrorKind::UnsupportedFilter)),
    }
    Ok(())
}

/// Apply the PNG Up filter (type 2) to raw rows.
///
/// Up is what predictor-12 xref streams use; it compresses monotone offset
/// columns well and needs no per-pixel state.
pub fn png_encode_up(data: &[u8], bytes_per_row: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + data.len() / bytes_per_row.max(1) + 1);
    let mut prev_row = vec![0u8; bytes_per_row];
    for row in data.chunks(bytes_per_row.max(1)) {
        out.push(2);
        for (i, &byte) in row.iter().enumerate() {
            out.push(byte.wrapping_sub(prev_row[i]));
        }
        prev_row[..row.len()].copy_from_slice(row);
    }
    out
}

fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let (a, b, c) = (a as i32, b as i32, c as i32);
    let p = a + b - c;
    let pa = (p - a).abs();
    let pb = (p - b).abs();
    let pc = (p - c).abs();
    if pa <= pb && pa <= pc {
        a as u8
    } else if pb <= pc {
        b as u8
    } else {
        c as u8
    }
}
