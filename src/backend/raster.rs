//! Resize + encode shared by the real backends.
//!
//! | Step | Crate / function |
//! |---|---|
//! | Resize | `DynamicImage::resize_exact` with `Lanczos3` |
//! | JPEG | `image::codecs::jpeg::JpegEncoder`, quality 1-100 |
//! | PNG | `image::codecs::png::PngEncoder`, quality selects compression effort |
//! | WebP | `webp::Encoder`, lossy, quality 0-100 |
//!
//! Everything here blocks; callers run it on `spawn_blocking`.

use super::EncodeRequest;
use crate::compression::{OutputFormat, Quality};
use crate::{Error, Result};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::imageops::FilterType;
use image::{DynamicImage, ExtendedColorType, ImageEncoder};
use std::borrow::Cow;

/// Encoded output of a single render.
#[derive(Debug)]
pub struct Rendered {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Resize `image` to exactly the requested dimensions and encode it.
pub fn render(image: &DynamicImage, request: &EncodeRequest) -> Result<Rendered> {
    if request.width == 0 || request.height == 0 {
        return Err(Error::Backend(format!(
            "Cannot encode a {}x{} image",
            request.width, request.height
        )));
    }

    let resized = if image.width() == request.width && image.height() == request.height {
        Cow::Borrowed(image)
    } else {
        Cow::Owned(image.resize_exact(request.width, request.height, FilterType::Lanczos3))
    };

    let bytes = match request.format {
        OutputFormat::Jpeg => encode_jpeg(&resized, request.quality)?,
        OutputFormat::Png => encode_png(&resized, request.quality)?,
        OutputFormat::Webp => encode_webp(&resized, request.quality)?,
    };

    Ok(Rendered {
        bytes,
        width: resized.width(),
        height: resized.height(),
    })
}

fn encode_jpeg(image: &DynamicImage, quality: Quality) -> Result<Vec<u8>> {
    // JPEG has no alpha channel
    let rgb = image.to_rgb8();
    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality.percent());
    encoder.encode(
        rgb.as_raw(),
        rgb.width(),
        rgb.height(),
        ExtendedColorType::Rgb8,
    )?;
    Ok(buf)
}

/// PNG is lossless, so lower quality buys a smaller file through more effort.
fn png_compression(quality: Quality) -> CompressionType {
    match quality.hundredths() {
        90..=100 => CompressionType::Fast,
        70..=89 => CompressionType::Default,
        _ => CompressionType::Best,
    }
}

fn encode_png(image: &DynamicImage, quality: Quality) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let encoder =
        PngEncoder::new_with_quality(&mut buf, png_compression(quality), PngFilter::Adaptive);
    if image.color().has_alpha() {
        let rgba = image.to_rgba8();
        encoder.write_image(
            rgba.as_raw(),
            rgba.width(),
            rgba.height(),
            ExtendedColorType::Rgba8,
        )?;
    } else {
        let rgb = image.to_rgb8();
        encoder.write_image(
            rgb.as_raw(),
            rgb.width(),
            rgb.height(),
            ExtendedColorType::Rgb8,
        )?;
    }
    Ok(buf)
}

fn encode_webp(image: &DynamicImage, quality: Quality) -> Result<Vec<u8>> {
    let rgba = image.to_rgba8();
    let encoder = webp::Encoder::from_rgba(rgba.as_raw(), rgba.width(), rgba.height());
    let encoded = encoder
        .encode_simple(false, quality.as_f32() * 100.0)
        .map_err(|e| Error::Backend(format!("WebP encode failed: {:?}", e)))?;
    Ok(encoded.to_vec())
}
