//! Decode, downscale and re-encode logo images.
//!
//! Every stored logo is a baseline JPEG no wider than [`MAX_LOGO_WIDTH`].

use super::error::UploadError;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;

/// Logos wider than this are scaled down to exactly this width.
pub const MAX_LOGO_WIDTH: u32 = 800;

/// JPEG quality of every stored logo.
pub const JPEG_QUALITY: u8 = 80;

/// Result of normalizing one image.
#[derive(Debug)]
pub struct NormalizedImage {
    pub jpeg: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub source_width: u32,
    pub source_height: u32,
}

/// Output dimensions for a source image.
///
/// Width is capped at [`MAX_LOGO_WIDTH`]; height keeps the aspect ratio,
/// rounded to the nearest pixel and never below 1.
pub fn target_dimensions(width: u32, height: u32) -> (u32, u32) {
    if width <= MAX_LOGO_WIDTH {
        return (width, height);
    }
    let (w, h, max) = (
        u64::from(width),
        u64::from(height),
        u64::from(MAX_LOGO_WIDTH),
    );
    let scaled = ((h * max + w / 2) / w).max(1);
    (MAX_LOGO_WIDTH, scaled as u32)
}

/// Decode `bytes` (format sniffed from content), downscale if needed and
/// encode as JPEG at [`JPEG_QUALITY`].
pub fn normalize(bytes: &[u8]) -> Result<NormalizedImage, UploadError> {
    let img = image::load_from_memory(bytes).map_err(|e| UploadError::Decode(e.to_string()))?;

    let (source_width, source_height) = (img.width(), img.height());
    let (width, height) = target_dimensions(source_width, source_height);

    let img = if (width, height) != (source_width, source_height) {
        tracing::debug!(
            "Resizing logo {}x{} -> {}x{}",
            source_width,
            source_height,
            width,
            height
        );
        img.resize_exact(width, height, FilterType::Lanczos3)
    } else {
        img
    };

    let rgb = img.to_rgb8();

    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY)
        .encode_image(&rgb)
        .map_err(|e| UploadError::Encode(e.to_string()))?;

    Ok(NormalizedImage {
        jpeg,
        width,
        height,
        source_width,
        source_height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn encode(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
        let img = RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, 128, 200])
        });
        let img = match format {
            ImageFormat::Jpeg => DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(img).to_rgb8()),
            _ => DynamicImage::ImageRgba8(img),
        };
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, format).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_target_dimensions() {
        assert_eq!(target_dimensions(640, 480), (640, 480));
        assert_eq!(target_dimensions(800, 3000), (800, 3000));
        assert_eq!(target_dimensions(1600, 900), (800, 450));
        assert_eq!(target_dimensions(1000, 333), (800, 266));
        assert_eq!(target_dimensions(1001, 1001), (800, 800));
        assert_eq!(target_dimensions(10_000, 1), (800, 1));
    }

    #[test]
    fn test_wide_image_is_downscaled() {
        let out = normalize(&encode(1600, 900, ImageFormat::Jpeg)).unwrap();
        assert_eq!((out.width, out.height), (800, 450));
        assert_eq!((out.source_width, out.source_height), (1600, 900));

        let decoded = image::load_from_memory(&out.jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (800, 450));
        assert_eq!(
            image::guess_format(&out.jpeg).unwrap(),
            ImageFormat::Jpeg
        );
    }

    #[test]
    fn test_small_png_keeps_size_and_becomes_jpeg() {
        let out = normalize(&encode(120, 60, ImageFormat::Png)).unwrap();
        assert_eq!((out.width, out.height), (120, 60));
        assert_eq!(
            image::guess_format(&out.jpeg).unwrap(),
            ImageFormat::Jpeg
        );
    }

    #[test]
    fn test_garbage_is_a_decode_error() {
        let err = normalize(b"definitely not an image").unwrap_err();
        assert!(matches!(err, UploadError::Decode(_)));
    }
}
