//! Preparing raster images for embedding.
//!
//! JPEG files that need no changes go into the PDF untouched. Everything
//! else is decoded, flattened onto a white background (signature pads
//! export transparent PNGs), optionally downscaled, and either re-encoded
//! as JPEG or kept as raw RGB samples.

use std::io::Cursor;

use image::codecs::jpeg::{JpegDecoder, JpegEncoder};
use image::imageops::FilterType;
use image::{ColorType, DynamicImage, ImageDecoder, ImageFormat, Rgb, RgbImage};

use crate::error::ReportError;
use crate::pdf::{ImageEncoding, PdfImage};

/// How an image should be prepared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RasterOptions {
    /// Downscale (keeping aspect ratio) when wider than this.
    pub max_width: Option<u32>,
    /// Re-encode as JPEG at this quality (1-100).
    pub jpeg_quality: Option<u8>,
}

/// Decode `bytes` and turn them into an embeddable image.
pub fn prepare(bytes: &[u8], options: RasterOptions) -> Result<PdfImage, ReportError> {
    let format = image::guess_format(bytes)?;

    if format == ImageFormat::Jpeg && options.jpeg_quality.is_none() {
        if let Some(image) = passthrough_jpeg(bytes, options.max_width)? {
            return Ok(image);
        }
    }

    let decoded = image::load_from_memory_with_format(bytes, format)?;
    let mut rgb = flatten_on_white(&decoded);

    if let Some(max) = options.max_width {
        if rgb.width() > max {
            let height = (u64::from(rgb.height()) * u64::from(max) / u64::from(rgb.width())).max(1);
            rgb = image::imageops::resize(&rgb, max, height as u32, FilterType::Triangle);
        }
    }

    let (width, height) = rgb.dimensions();
    match options.jpeg_quality {
        Some(quality) => {
            let mut data = Vec::new();
            JpegEncoder::new_with_quality(&mut data, quality.clamp(1, 100)).encode_image(&rgb)?;
            Ok(PdfImage {
                width,
                height,
                grayscale: false,
                encoding: ImageEncoding::Jpeg,
                data,
            })
        }
        None => Ok(PdfImage {
            width,
            height,
            grayscale: false,
            encoding: ImageEncoding::Raw,
            data: rgb.into_raw(),
        }),
    }
}

/// Embed a JPEG verbatim when its size and color model allow it.
fn passthrough_jpeg(bytes: &[u8], max_width: Option<u32>) -> Result<Option<PdfImage>, ReportError> {
    let decoder = JpegDecoder::new(Cursor::new(bytes))?;
    let (width, height) = decoder.dimensions();
    if max_width.is_some_and(|max| width > max) {
        return Ok(None);
    }
    let grayscale = match decoder.color_type() {
        ColorType::L8 => true,
        ColorType::Rgb8 => false,
        _ => return Ok(None),
    };
    Ok(Some(PdfImage {
        width,
        height,
        grayscale,
        encoding: ImageEncoding::Jpeg,
        data: bytes.to_vec(),
    }))
}

/// Composite any alpha channel over white.
fn flatten_on_white(image: &DynamicImage) -> RgbImage {
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    RgbImage::from_fn(width, height, |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let a = u16::from(a);
        let blend = |c: u8| ((u16::from(c) * a + 255 * (255 - a)) / 255) as u8;
        Rgb([blend(r), blend(g), blend(b)])
    })
}
