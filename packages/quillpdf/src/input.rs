//! Byte-input normalization
//!
//! Bytes-bearing API calls accept a raw buffer, a base64 string, or a
//! `data:` URI. Everything funnels through [`into_bytes`] so the rest of
//! the library only ever sees a plain byte buffer.

use crate::error::{Error, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

/// An input value whose byte interpretation has not been decided yet.
#[derive(Debug, Clone)]
pub enum RawInput {
    Binary(Vec<u8>),
    Text(String),
}

impl From<Vec<u8>> for RawInput {
    fn from(data: Vec<u8>) -> Self {
        RawInput::Binary(data)
    }
}

impl From<&[u8]> for RawInput {
    fn from(data: &[u8]) -> Self {
        RawInput::Binary(data.to_vec())
    }
}

impl<const N: usize> From<&[u8; N]> for RawInput {
    fn from(data: &[u8; N]) -> Self {
        RawInput::Binary(data.to_vec())
    }
}

impl From<String> for RawInput {
    fn from(text: String) -> Self {
        RawInput::Text(text)
    }
}

impl From<&str> for RawInput {
    fn from(text: &str) -> Self {
        RawInput::Text(text.to_string())
    }
}

/// Normalize an input into its byte buffer.
///
/// Strings are tried as a data URI first, then as base64 (whitespace
/// ignored); anything else is an error, because passing arbitrary text
/// where bytes are expected is nearly always a caller bug.
pub fn into_bytes(input: RawInput) -> Result<Vec<u8>> {
    match input {
        RawInput::Binary(data) => Ok(data),
        RawInput::Text(text) => {
            if let Some(payload) = data_uri_payload(&text) {
                return decode_base64(payload);
            }
            decode_base64(&text)
        }
    }
}

/// The base64 payload of a `data:<mime>;base64,<payload>` URI.
///
/// The MIME type is not validated against the content.
pub fn data_uri_payload(text: &str) -> Option<&str> {
    let rest = text.strip_prefix("data:")?;
    let comma = rest.find(',')?;
    let (header, payload) = rest.split_at(comma);
    if !header.to_ascii_lowercase().ends_with(";base64") {
        return None;
    }
    Some(&payload[1..])
}

/// Decode standard base64, ignoring embedded whitespace.
pub fn decode_base64(text: &str) -> Result<Vec<u8>> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| Error::invalid(format!("invalid base64 input: {}", e)))
}

/// Encode bytes as standard base64.
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}
