//! PNG image embedder
//!
//! PNG's scanline format maps directly onto PDF: FlateDecode with the
//! PNG predictor set (`/Predictor 15`) understands the per-row filter
//! bytes, so images without transparency keep their original zlib payload
//! byte-for-byte. Images with an alpha channel are decoded once, split
//! into color and alpha planes, and re-deflated; the alpha plane becomes a
//! grayscale `/SMask` XObject. Chunk CRCs are not verified.

use crate::embed::Embedder;
use crate::error::{EmbedErrorKind, Error, Result};
use crate::pdf::context::Context;
use crate::pdf::filter::{flate, predictor};
use crate::pdf::object::{DictExt, Object, ObjRef, PdfString, StringKind};

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1A, b'\n'];

#[derive(Debug)]
pub struct PngEmbedder {
    width: u32,
    height: u32,
    bit_depth: u8,
    color_type: u8,
    palette: Vec<u8>,
    /// Palette alpha from tRNS, when present
    trns: Vec<u8>,
    /// Concatenated IDAT payload, still zlib-compressed
    idat: Vec<u8>,
}

impl PngEmbedder {
    pub fn new(data: Vec<u8>) -> Result<Self> {
        parse_chunks(&data)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn has_alpha_channel(&self) -> bool {
        matches!(self.color_type, 4 | 6)
    }

    /// Color channels excluding alpha.
    fn color_channels(&self) -> usize {
        match self.color_type {
            2 | 6 => 3,
            _ => 1,
        }
    }

    fn channels(&self) -> usize {
        self.color_channels() + usize::from(self.has_alpha_channel())
    }

    fn color_space(&self, ctx: &mut Context) -> Object {
        match self.color_type {
            2 | 6 => Object::from("DeviceRGB"),
            3 => {
                let hival = (self.palette.len() / 3).saturating_sub(1) as i64;
                let lookup = ctx.register(Object::String(PdfString::new(
                    self.palette.clone(),
                    StringKind::Hex,
                )));
                Object::Array(vec![
                    Object::from("Indexed"),
                    Object::from("DeviceRGB"),
                    Object::Int(hival),
                    Object::Ref(lookup),
                ])
            }
            _ => Object::from("DeviceGray"),
        }
    }

    /// Inflate and unfilter the scanlines into raw interleaved samples.
    fn decoded_samples(&self) -> Result<Vec<u8>> {
        let inflated = flate::decode(&self.idat, None)
            .map_err(|_| Error::Embed(EmbedErrorKind::PngTruncatedIdat))?;
        let bpp = (self.channels() * self.bit_depth as usize).div_ceil(8);
        let bytes_per_row =
            (self.channels() * self.bit_depth as usize * self.width as usize).div_ceil(8);
        let expected = (bytes_per_row + 1) * self.height as usize;
        if inflated.len() < expected {
            return Err(Error::Embed(EmbedErrorKind::PngTruncatedIdat));
        }
        predictor::png_decode(&inflated[..expected], bytes_per_row, bpp)
            .map_err(|_| Error::Embed(EmbedErrorKind::PngTruncatedIdat))
    }

    /// Split interleaved color+alpha samples into two planes.
    fn split_alpha(&self, samples: &[u8]) -> (Vec<u8>, Vec<u8>) {
        let colors = self.color_channels();
        let stride = colors + 1;
        let pixels = samples.len() / stride;
        let mut color = Vec::with_capacity(pixels * colors);
        let mut alpha = Vec::with_capacity(pixels);
        for pixel in samples.chunks_exact(stride) {
            color.extend_from_slice(&pixel[..colors]);
            alpha.push(pixel[colors]);
        }
        (color, alpha)
    }

    /// Alpha plane for a paletted image, looked up through tRNS.
    fn palette_alpha(&self, indices: &[u8]) -> Vec<u8> {
        indices
            .iter()
            .map(|&i| self.trns.get(i as usize).copied().unwrap_or(0xFF))
            .collect()
    }

    fn register_smask(&self, ctx: &mut Context, alpha: Vec<u8>) -> ObjRef {
        let compressed = flate::encode(&alpha);
        ctx.register(Object::Stream {
            dict: crate::dict! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => self.width as i64,
                "Height" => self.height as i64,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
                "Filter" => "FlateDecode",
                "Length" => compressed.len(),
            },
            data: compressed,
        })
    }
}

impl Embedder for PngEmbedder {
    fn embed_into(&self, ctx: &mut Context, target: ObjRef) -> Result<()> {
        let mut dict = crate::dict! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => self.width as i64,
            "Height" => self.height as i64,
        };
        dict.set("ColorSpace", self.color_space(ctx));

        if self.has_alpha_channel() {
            // Decode once, split planes, recompress both
            let samples = self.decoded_samples()?;
            let (color, alpha) = self.split_alpha(&samples);
            let smask = self.register_smask(ctx, alpha);
            let compressed = flate::encode(&color);
            dict.set("BitsPerComponent", 8);
            dict.set("Filter", "FlateDecode");
            dict.set("SMask", smask);
            dict.set("Length", compressed.len());
            ctx.assign(
                target,
                Object::Stream {
                    dict,
                    data: compressed,
                },
            );
            return Ok(());
        }

        // No alpha channel: the zlib IDAT payload passes straight through,
        // with the predictor declaration letting the reader undo the PNG
        // row filters itself.
        if self.color_type == 3 && !self.trns.is_empty() {
            let indices = self.decoded_samples()?;
            let smask = self.register_smask(ctx, self.palette_alpha(&indices));
            dict.set("SMask", smask);
        }
        dict.set("BitsPerComponent", self.bit_depth as i64);
        dict.set("Filter", "FlateDecode");
        dict.set(
            "DecodeParms",
            Object::Dict(crate::dict! {
                "Predictor" => 15,
                "Colors" => self.color_channels() as i64,
                "BitsPerComponent" => self.bit_depth as i64,
                "Columns" => self.width as i64,
            }),
        );
        dict.set("Length", self.idat.len());
        ctx.assign(
            target,
            Object::Stream {
                dict,
                data: self.idat.clone(),
            },
        );
        Ok(())
    }
}

fn parse_chunks(data: &[u8]) -> Result<PngEmbedder> {
    if data.len() < PNG_SIGNATURE.len() || data[..8] != PNG_SIGNATURE {
        return Err(Error::invalid("not a PNG file"));
    }

    let mut ihdr: Option<(u32, u32, u8, u8)> = None;
    let mut palette = Vec::new();
    let mut trns = Vec::new();
    let mut idat = Vec::new();

    let mut pos = 8usize;
    while pos + 8 <= data.len() {
        let length =
            u32::from_be_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]]) as usize;
        let chunk_type = &data[pos + 4..pos + 8];
        let body_start = pos + 8;
        let body_end = body_start + length;
        if body_end + 4 > data.len() {
            return Err(Error::Embed(EmbedErrorKind::PngTruncatedIdat));
        }
        let body = &data[body_start..body_end];

        match chunk_type {
            b"IHDR" => {
                if body.len() < 13 {
                    return Err(Error::Embed(EmbedErrorKind::PngMissingIhdr));
                }
                let width = u32::from_be_bytes([body[0], body[1], body[2], body[3]]);
                let height = u32::from_be_bytes([body[4], body[5], body[6], body[7]]);
                let bit_depth = body[8];
                let color_type = body[9];
                let interlace = body[12];
                if interlace != 0 {
                    return Err(Error::Embed(EmbedErrorKind::PngUnsupported(
                        "interlaced (Adam7) images".to_string(),
                    )));
                }
                if matches!(color_type, 4 | 6) && bit_depth != 8 {
                    return Err(Error::Embed(EmbedErrorKind::PngUnsupported(format!(
                        "{}-bit samples with an alpha channel",
                        bit_depth
                    ))));
                }
                ihdr = Some((width, height, bit_depth, color_type));
            }
            b"PLTE" => palette = body.to_vec(),
            b"tRNS" => trns = body.to_vec(),
            b"IDAT" => idat.extend_from_slice(body),
            b"IEND" => break,
            _ => {}
        }
        pos = body_end + 4;
    }

    let Some((width, height, bit_depth, color_type)) = ihdr else {
        return Err(Error::Embed(EmbedErrorKind::PngMissingIhdr));
    };
    if idat.is_empty() {
        return Err(Error::Embed(EmbedErrorKind::PngTruncatedIdat));
    }
    if color_type == 3 && !trns.is_empty() && bit_depth != 8 {
        return Err(Error::Embed(EmbedErrorKind::PngUnsupported(
            "palette transparency below 8-bit depth".to_string(),
        )));
    }

    Ok(PngEmbedder {
        width,
        height,
        bit_depth,
        color_type,
        palette,
        trns,
        idat,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a PNG from raw interleaved samples, one filter-0 scanline per
    /// row. CRCs are zeroed; the embedder does not check them.
    fn fake_png(
        width: u32,
        height: u32,
        bit_depth: u8,
        color_type: u8,
        samples_per_row: &[Vec<u8>],
        palette: Option<&[u8]>,
        trns: Option<&[u8]>,
    ) -> Vec<u8> {
        let mut out = PNG_SIGNATURE.to_vec();
        let mut push_chunk = |out: &mut Vec<u8>, tag: &[u8; 4], body: &[u8]| {
            out.extend_from_slice(&(body.len() as u32).to_be_bytes());
            out.extend_from_slice(tag);
            out.extend_from_slice(body);
            out.extend_from_slice(&[0, 0, 0, 0]);
        };

        let mut ihdr = Vec::new();
        ihdr.extend_from_slice(&width.to_be_bytes());
        ihdr.extend_from_slice(&height.to_be_bytes());
        ihdr.extend_from_slice(&[bit_depth, color_type, 0, 0, 0]);
        push_chunk(&mut out, b"IHDR", &ihdr);
        if let Some(p) = palette {
            push_chunk(&mut out, b"PLTE", p);
        }
        if let Some(t) = trns {
            push_chunk(&mut out, b"tRNS", t);
        }

        let mut raw = Vec::new();
        for row in samples_per_row {
            raw.push(0);
            raw.extend_from_slice(row);
        }
        push_chunk(&mut out, b"IDAT", &flate::encode(&raw));
        push_chunk(&mut out, b"IEND", b"");
        out
    }

    #[test]
    fn test_rgb_passthrough() {
        let rows = vec![vec![10, 20, 30, 40, 50, 60], vec![1, 2, 3, 4, 5, 6]];
        let png = fake_png(2, 2, 8, 2, &rows, None, None);
        let embedder = PngEmbedder::new(png).unwrap();
        assert_eq!((embedder.width(), embedder.height()), (2, 2));

        let mut ctx = Context::new();
        let target = ctx.next_ref();
        embedder.embed_into(&mut ctx, target).unwrap();
        let (dict, data) = ctx.resolve(target).as_stream().unwrap();
        assert_eq!(dict.get_name("ColorSpace").unwrap().as_str(), "DeviceRGB");
        assert!(dict.get_key("SMask").is_none());
        let parms = dict.get_key("DecodeParms").unwrap().as_dict().unwrap();
        assert_eq!(parms.get_int("Predictor"), Some(15));
        assert_eq!(parms.get_int("Colors"), Some(3));
        // Payload is the original zlib stream: inflating and unfiltering
        // recovers the samples
        let inflated = flate::decode(data, None).unwrap();
        let unfiltered = predictor::png_decode(&inflated, 6, 3).unwrap();
        assert_eq!(unfiltered, [10, 20, 30, 40, 50, 60, 1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_rgba_splits_into_smask() {
        // 2x2 RGBA
        let rows = vec![
            vec![255, 0, 0, 128, 0, 255, 0, 255],
            vec![0, 0, 255, 0, 9, 9, 9, 7],
        ];
        let png = fake_png(2, 2, 8, 6, &rows, None, None);
        let embedder = PngEmbedder::new(png).unwrap();

        let mut ctx = Context::new();
        let target = ctx.next_ref();
        embedder.embed_into(&mut ctx, target).unwrap();

        let (dict, data) = ctx.resolve(target).as_stream().unwrap();
        assert_eq!(dict.get_name("ColorSpace").unwrap().as_str(), "DeviceRGB");
        let color = flate::decode(data, None).unwrap();
        // w * h * 3 color bytes
        assert_eq!(
            color,
            vec![255, 0, 0, 0, 255, 0, 0, 0, 255, 9, 9, 9]
        );

        let smask_ref = dict.get_ref("SMask").unwrap();
        let (smask_dict, smask_data) = ctx.resolve(smask_ref).as_stream().unwrap();
        assert_eq!(
            smask_dict.get_name("ColorSpace").unwrap().as_str(),
            "DeviceGray"
        );
        let alpha = flate::decode(smask_data, None).unwrap();
        assert_eq!(alpha, vec![128, 255, 0, 7]);
    }

    #[test]
    fn test_gray_alpha_splits() {
        let rows = vec![vec![50, 200, 60, 100]];
        let png = fake_png(2, 1, 8, 4, &rows, None, None);
        let embedder = PngEmbedder::new(png).unwrap();

        let mut ctx = Context::new();
        let target = ctx.next_ref();
        embedder.embed_into(&mut ctx, target).unwrap();
        let (dict, data) = ctx.resolve(target).as_stream().unwrap();
        assert_eq!(dict.get_name("ColorSpace").unwrap().as_str(), "DeviceGray");
        assert_eq!(flate::decode(data, None).unwrap(), vec![50, 60]);
        let smask_ref = dict.get_ref("SMask").unwrap();
        let (_, smask_data) = ctx.resolve(smask_ref).as_stream().unwrap();
        assert_eq!(flate::decode(smask_data, None).unwrap(), vec![200, 100]);
    }

    #[test]
    fn test_indexed_with_palette() {
        let palette = [255, 0, 0, 0, 255, 0, 0, 0, 255];
        let rows = vec![vec![0, 2], vec![1, 1]];
        let png = fake_png(2, 2, 8, 3, &rows, Some(&palette), None);
        let embedder = PngEmbedder::new(png).unwrap();

        let mut ctx = Context::new();
        let target = ctx.next_ref();
        embedder.embed_into(&mut ctx, target).unwrap();
        let (dict, _) = ctx.resolve(target).as_stream().unwrap();
        let cs = dict.get_key("ColorSpace").unwrap().as_array().unwrap();
        assert_eq!(cs[0].as_name().unwrap().as_str(), "Indexed");
        assert_eq!(cs[2].as_int(), Some(2));
        let lookup = ctx.resolve(cs[3].as_ref_obj().unwrap());
        assert_eq!(lookup.as_string().unwrap().as_bytes(), palette);
    }

    #[test]
    fn test_indexed_trns_builds_smask() {
        let palette = [255, 0, 0, 0, 255, 0];
        let trns = [10u8];
        let rows = vec![vec![0, 1]];
        let png = fake_png(2, 1, 8, 3, &rows, Some(&palette), Some(&trns));
        let embedder = PngEmbedder::new(png).unwrap();

        let mut ctx = Context::new();
        let target = ctx.next_ref();
        embedder.embed_into(&mut ctx, target).unwrap();
        let (dict, _) = ctx.resolve(target).as_stream().unwrap();
        let smask_ref = dict.get_ref("SMask").unwrap();
        let (_, smask_data) = ctx.resolve(smask_ref).as_stream().unwrap();
        // Index 0 -> tRNS alpha 10; index 1 beyond table -> opaque
        assert_eq!(flate::decode(smask_data, None).unwrap(), vec![10, 255]);
    }

    #[test]
    fn test_missing_ihdr() {
        let mut data = PNG_SIGNATURE.to_vec();
        data.extend_from_slice(&[0, 0, 0, 0]);
        data.extend_from_slice(b"IEND");
        data.extend_from_slice(&[0, 0, 0, 0]);
        let err = PngEmbedder::new(data).unwrap_err();
        assert!(matches!(err, Error::Embed(EmbedErrorKind::PngMissingIhdr)));
    }

    #[test]
    fn test_truncated_idat() {
        // Alpha forces the decode path, which notices the short payload
        let rows = vec![vec![1, 2, 3, 4]];
        let mut png = fake_png(1, 1, 8, 6, &rows, None, None);
        // Claim 4 rows in IHDR while providing one
        let height_at = 8 + 8 + 4;
        png[height_at..height_at + 4].copy_from_slice(&4u32.to_be_bytes());
        let embedder = PngEmbedder::new(png).unwrap();
        let mut ctx = Context::new();
        let target = ctx.next_ref();
        let err = embedder.embed_into(&mut ctx, target).unwrap_err();
        assert!(matches!(err, Error::Embed(EmbedErrorKind::PngTruncatedIdat)));
    }

    #[test]
    fn test_interlaced_rejected() {
        let rows = vec![vec![1, 2, 3]];
        let mut png = fake_png(1, 1, 8, 2, &rows, None, None);
        // Interlace flag lives at IHDR byte 12
        let interlace_at = 8 + 8 + 12;
        png[interlace_at] = 1;
        let err = PngEmbedder::new(png).unwrap_err();
        assert!(matches!(
            err,
            Error::Embed(EmbedErrorKind::PngUnsupported(_))
        ));
    }

    #[test]
    fn test_not_a_png() {
        assert!(PngEmbedder::new(b"JFIF".to_vec()).is_err());
    }
}
