//! PDF stream filters
//!
//! Decoding for the filter pipeline named by a stream's `/Filter` entry.
//! FlateDecode is the workhorse; ASCIIHex, ASCII85, LZW and RunLength are
//! accepted on read. The image codecs (DCT, CCITT, JBIG2, JPX) are never
//! decoded here: image streams pass through the library byte-for-byte.

pub mod ascii85;
pub mod asciihex;
pub mod flate;
pub mod lzw;
pub mod params;
pub mod predictor;
pub mod runlength;

pub use params::DecodeParams;

use crate::error::{Error, ParseErrorKind, Result};
use crate::pdf::object::{Dict, DictExt, Object};

/// Filters named by the PDF specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
    FlateDecode,
    LZWDecode,
    ASCII85Decode,
    ASCIIHexDecode,
    RunLengthDecode,
    /// Image codec, passed through undecoded
    DCTDecode,
    /// Image codec, passed through undecoded
    CCITTFaxDecode,
    /// Image codec, passed through undecoded
    JBIG2Decode,
    /// Image codec, passed through undecoded
    JPXDecode,
}

impl FilterType {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "FlateDecode" | "Fl" => Some(FilterType::FlateDecode),
            "LZWDecode" | "LZW" => Some(FilterType::LZWDecode),
            "ASCII85Decode" | "A85" => Some(FilterType::ASCII85Decode),
            "ASCIIHexDecode" | "AHx" => Some(FilterType::ASCIIHexDecode),
            "RunLengthDecode" | "RL" => Some(FilterType::RunLengthDecode),
            "DCTDecode" | "DCT" => Some(FilterType::DCTDecode),
            "CCITTFaxDecode" | "CCF" => Some(FilterType::CCITTFaxDecode),
            "JBIG2Decode" => Some(FilterType::JBIG2Decode),
            "JPXDecode" => Some(FilterType::JPXDecode),
            _ => None,
        }
    }

    pub fn to_name(self) -> &'static str {
        match self {
            FilterType::FlateDecode => "FlateDecode",
            FilterType::LZWDecode => "LZWDecode",
            FilterType::ASCII85Decode => "ASCII85Decode",
            FilterType::ASCIIHexDecode => "ASCIIHexDecode",
            FilterType::RunLengthDecode => "RunLengthDecode",
            FilterType::DCTDecode => "DCTDecode",
            FilterType::CCITTFaxDecode => "CCITTFaxDecode",
            FilterType::JBIG2Decode => "JBIG2Decode",
            FilterType::JPXDecode => "JPXDecode",
        }
    }

    /// True for codecs this library stores without decoding.
    pub fn is_image_codec(self) -> bool {
        matches!(
            self,
            FilterType::DCTDecode
                | FilterType::CCITTFaxDecode
                | FilterType::JBIG2Decode
                | FilterType::JPXDecode
        )
    }
}

/// Read a stream dict's `/Filter` and `/DecodeParms` into aligned lists.
///
/// Both entries may be a single value or an array; a missing or null parms
/// slot yields `None`.
pub fn filter_chain(dict: &Dict) -> Result<Vec<(FilterType, Option<DecodeParams>)>> {
    let filters: Vec<&str> = match dict.get_key("Filter") {
        None | Some(Object::Null) => return Ok(Vec::new()),
        Some(Object::Name(n)) => vec![n.as_str()],
        Some(Object::Array(items)) => items
            .iter()
            .filter_map(|o| o.as_name().map(|n| n.as_str()))
            .collect(),
        Some(_) => return Err(Error::parse(0, ParseErrorKind::UnsupportedFilter)),
    };

    let parms: Vec<Option<DecodeParams>> = match dict.get_key("DecodeParms") {
        None | Some(Object::Null) => vec![None; filters.len()],
        Some(Object::Dict(d)) => {
            let mut v = vec![None; filters.len()];
            if !v.is_empty() {
                v[0] = Some(DecodeParams::from_dict(d));
            }
            v
        }
        Some(Object::Array(items)) => {
            let mut v: Vec<Option<DecodeParams>> = items
                .iter()
                .map(|o| o.as_dict().map(DecodeParams::from_dict))
                .collect();
            v.resize(filters.len(), None);
            v
        }
        Some(_) => vec![None; filters.len()],
    };

    filters
        .iter()
        .zip(parms)
        .map(|(name, p)| {
            FilterType::from_name(name)
                .map(|f| (f, p))
                .ok_or_else(|| Error::parse(0, ParseErrorKind::UnsupportedFilter))
        })
        .collect()
}

/// Run a stream's full decode pipeline.
///
/// Used for object streams, xref streams and PNG-style payload work; image
/// codec filters are an error here because their data never needs decoding.
pub fn decode_pipeline(dict: &Dict, data: &[u8]) -> Result<Vec<u8>> {
    let chain = filter_chain(dict)?;
    let mut current = data.to_vec();
    for (filter, parms) in chain {
        current = match filter {
            FilterType::FlateDecode => flate::decode(&current, parms.as_ref())?,
            FilterType::LZWDecode => {
                let p = parms.unwrap_or_default();
                let decoded = lzw::decode(&current, p.early_change)?;
                if p.predictor > 1 {
                    predictor::decode(&decoded, &p)?
                } else {
                    decoded
                }
            }
            FilterType::ASCII85Decode => ascii85::decode(&current)?,
            FilterType::ASCIIHexDecode => asciihex::decode(&current)?,
            FilterType::RunLengthDecode => runlength::decode(&current)?,
            _ => return Err(Error::parse(0, ParseErrorKind::UnsupportedFilter)),
        };
    }
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dict;

    #[test]
    fn test_filter_type_names() {
        assert_eq!(
            FilterType::from_name("FlateDecode"),
            Some(FilterType::FlateDecode)
        );
        assert_eq!(FilterType::from_name("AHx"), Some(FilterType::ASCIIHexDecode));
        assert_eq!(FilterType::from_name("Nope"), None);
        assert_eq!(FilterType::FlateDecode.to_name(), "FlateDecode");
        assert!(FilterType::DCTDecode.is_image_codec());
        assert!(!FilterType::FlateDecode.is_image_codec());
    }

    #[test]
    fn test_decode_pipeline_single_flate() {
        let payload = b"some page content stream bytes";
        let compressed = flate::encode(payload);
        let d = dict! { "Filter" => "FlateDecode" };
        assert_eq!(decode_pipeline(&d, &compressed).unwrap(), payload);
    }

    #[test]
    fn test_decode_pipeline_chained() {
        // Flate inside ASCIIHex: decoded right-to-left per the array order
        let payload = b"chained filters";
        let compressed = flate::encode(payload);
        let hex: String = compressed.iter().map(|b| format!("{:02X}", b)).collect();
        let mut data = hex.into_bytes();
        data.push(b'>');
        let d = dict! {
            "Filter" => vec![
                Object::from("ASCIIHexDecode"),
                Object::from("FlateDecode"),
            ],
        };
        assert_eq!(decode_pipeline(&d, &data).unwrap(), payload);
    }

    #[test]
    fn test_decode_pipeline_no_filter_passthrough() {
        let d = dict! {};
        assert_eq!(decode_pipeline(&d, b"raw").unwrap(), b"raw");
    }

    #[test]
    fn test_decode_pipeline_rejects_image_codec() {
        let d = dict! { "Filter" => "DCTDecode" };
        assert!(decode_pipeline(&d, b"\xff\xd8").is_err());
    }

    #[test]
    fn test_filter_chain_with_parms_array() {
        let d = dict! {
            "Filter" => vec![Object::from("FlateDecode")],
            "DecodeParms" => vec![Object::Dict(dict! { "Predictor" => 12, "Columns" => 4 })],
        };
        let chain = filter_chain(&d).unwrap();
        assert_eq!(chain.len(), 1);
        let parms = chain[0].1.unwrap();
        assert_eq!(parms.predictor, 12);
        assert_eq!(parms.columns, 4);
    }
}
