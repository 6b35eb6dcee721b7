//! JPEG image embedder
//!
//! JPEG bytes pass through untouched: the stream keeps the original file
//! with `/Filter /DCTDecode`. Construction only walks the marker segments
//! far enough to find the frame header (SOF) for dimensions, bit depth and
//! the component count that picks the color space.

use crate::embed::Embedder;
use crate::error::{EmbedErrorKind, Error, Result};
use crate::pdf::context::Context;
use crate::pdf::object::{Object, ObjRef};

#[derive(Debug)]
pub struct JpegEmbedder {
    data: Vec<u8>,
    width: u32,
    height: u32,
    bits_per_component: u8,
    components: u8,
}

impl JpegEmbedder {
    pub fn new(data: Vec<u8>) -> Result<Self> {
        let frame = parse_frame_header(&data)?;
        if frame.precision != 8 {
            return Err(Error::Embed(EmbedErrorKind::UnsupportedJpegBitDepth));
        }
        if !matches!(frame.components, 1 | 3 | 4) {
            return Err(Error::invalid(format!(
                "JPEG with {} components is not supported",
                frame.components
            )));
        }
        Ok(Self {
            data,
            width: frame.width,
            height: frame.height,
            bits_per_component: frame.precision,
            components: frame.components,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn color_space(&self) -> &'static str {
        match self.components {
            1 => "DeviceGray",
            3 => "DeviceRGB",
            _ => "DeviceCMYK",
        }
    }
}

impl Embedder for JpegEmbedder {
    fn embed_into(&self, ctx: &mut Context, target: ObjRef) -> Result<()> {
        let mut dict = crate::dict! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => self.width as i64,
            "Height" => self.height as i64,
            "ColorSpace" => self.color_space(),
            "BitsPerComponent" => self.bits_per_component as i64,
            "Filter" => "DCTDecode",
            "Length" => self.data.len(),
        };
        if self.components == 4 {
            // Adobe writes CMYK JPEGs inverted
            use crate::pdf::object::DictExt;
            dict.set(
                "Decode",
                Object::Array(
                    std::iter::repeat([Object::Int(1), Object::Int(0)])
                        .take(4)
                        .flatten()
                        .collect(),
                ),
            );
        }
        ctx.assign(
            target,
            Object::Stream {
                dict,
                data: self.data.clone(),
            },
        );
        Ok(())
    }
}

struct FrameHeader {
    precision: u8,
    width: u32,
    height: u32,
    components: u8,
}

/// Walk the marker segments to the first SOF marker.
fn parse_frame_header(data: &[u8]) -> Result<FrameHeader> {
    if data.len() < 4 || data[0] != 0xFF || data[1] != 0xD8 {
        return Err(Error::invalid("not a JPEG file"));
    }
    let mut pos = 2usize;
    loop {
        if pos + 4 > data.len() {
            return Err(Error::invalid("JPEG truncated before frame header"));
        }
        if data[pos] != 0xFF {
            return Err(Error::invalid("malformed JPEG marker stream"));
        }
        // Fill bytes before a marker are legal
        let mut marker = data[pos + 1];
        while marker == 0xFF {
            pos += 1;
            if pos + 4 > data.len() {
                return Err(Error::invalid("JPEG truncated before frame header"));
            }
            marker = data[pos + 1];
        }
        match marker {
            // Standalone markers carry no length
            0xD0..=0xD9 | 0x01 => {
                pos += 2;
                continue;
            }
            _ => {}
        }
        let length = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
        if length < 2 || pos + 2 + length > data.len() {
            return Err(Error::invalid("JPEG segment length out of bounds"));
        }
        let is_sof = matches!(
            marker,
            0xC0..=0xC3 | 0xC5..=0xC7 | 0xC9..=0xCB | 0xCD..=0xCF
        );
        if is_sof {
            let seg = &data[pos + 4..pos + 2 + length];
            if seg.len() < 6 {
                return Err(Error::invalid("JPEG frame header too short"));
            }
            return Ok(FrameHeader {
                precision: seg[0],
                height: u16::from_be_bytes([seg[1], seg[2]]) as u32,
                width: u16::from_be_bytes([seg[3], seg[4]]) as u32,
                components: seg[5],
            });
        }
        if marker == 0xDA {
            // Scan data reached without a frame header
            return Err(Error::invalid("JPEG has no frame header"));
        }
        pos += 2 + length;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::object::DictExt;

    /// Assemble a minimal marker stream: SOI, APP0 stub, SOF0, EOI.
    fn fake_jpeg(precision: u8, width: u16, height: u16, components: u8) -> Vec<u8> {
        let mut out = vec![0xFF, 0xD8];
        // APP0 with a tiny payload
        out.extend_from_slice(&[0xFF, 0xE0, 0x00, 0x04, 0x4A, 0x46]);
        // SOF0: length covers precision + dims + ncomp + 3 bytes/component
        let sof_len = 8 + 3 * components as u16;
        out.extend_from_slice(&[0xFF, 0xC0]);
        out.extend_from_slice(&sof_len.to_be_bytes());
        out.push(precision);
        out.extend_from_slice(&height.to_be_bytes());
        out.extend_from_slice(&width.to_be_bytes());
        out.push(components);
        for i in 0..components {
            out.extend_from_slice(&[i + 1, 0x11, 0]);
        }
        out.extend_from_slice(&[0xFF, 0xD9]);
        out
    }

    #[test]
    fn test_parse_dimensions() {
        let jpeg = fake_jpeg(8, 640, 480, 3);
        let embedder = JpegEmbedder::new(jpeg).unwrap();
        assert_eq!(embedder.width(), 640);
        assert_eq!(embedder.height(), 480);
    }

    #[test]
    fn test_unsupported_bit_depth() {
        let err = JpegEmbedder::new(fake_jpeg(12, 10, 10, 3)).unwrap_err();
        assert!(matches!(
            err,
            Error::Embed(EmbedErrorKind::UnsupportedJpegBitDepth)
        ));
    }

    #[test]
    fn test_not_a_jpeg() {
        assert!(JpegEmbedder::new(b"PNG data".to_vec()).is_err());
    }

    #[test]
    fn test_embed_gray_rgb_cmyk_color_spaces() {
        for (components, space) in [(1u8, "DeviceGray"), (3, "DeviceRGB"), (4, "DeviceCMYK")] {
            let jpeg = fake_jpeg(8, 4, 4, components);
            let embedder = JpegEmbedder::new(jpeg.clone()).unwrap();
            let mut ctx = Context::new();
            let target = ctx.next_ref();
            embedder.embed_into(&mut ctx, target).unwrap();

            let (dict, data) = ctx.resolve(target).as_stream().unwrap();
            assert!(dict.is_type("XObject"));
            assert_eq!(dict.get_name("Subtype").unwrap().as_str(), "Image");
            assert_eq!(dict.get_name("ColorSpace").unwrap().as_str(), space);
            assert_eq!(dict.get_name("Filter").unwrap().as_str(), "DCTDecode");
            // The original bytes pass through untouched
            assert_eq!(data, &jpeg[..]);

            let decode = dict.get_key("Decode");
            if components == 4 {
                assert_eq!(decode.unwrap().as_array().unwrap().len(), 8);
            } else {
                assert!(decode.is_none());
            }
        }
    }

    #[test]
    fn test_two_component_jpeg_rejected() {
        assert!(JpegEmbedder::new(fake_jpeg(8, 4, 4, 2)).is_err());
    }
}
