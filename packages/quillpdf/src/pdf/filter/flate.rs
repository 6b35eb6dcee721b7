//! FlateDecode (zlib/deflate) filter

use crate::error::{Error, ParseErrorKind, Result};
use crate::pdf::filter::params::DecodeParams;
use crate::pdf::filter::predictor;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};

/// Decode zlib-compressed data and undo any predictor.
pub fn decode(data: &[u8], params: Option<&DecodeParams>) -> Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|_| Error::parse(0, ParseErrorKind::UnsupportedFilter))?;

    if let Some(params) = params {
        if params.predictor > 1 {
            out = predictor::decode(&out, params)?;
        }
    }
    Ok(out)
}

/// Compress data with zlib at the default level.
pub fn encode(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    // Writing to a Vec cannot fail
    encoder.write_all(data).expect("in-memory deflate");
    encoder.finish().expect("in-memory deflate")
}
