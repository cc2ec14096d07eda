//! Image decoding for the perceptual hash.
//!
//! JPEG goes through zune-jpeg, which is noticeably faster than the image
//! crate's decoder. Everything else, and any JPEG zune-jpeg rejects, goes
//! through `image::open`.

use crate::error::FingerprintError;
use image::{DynamicImage, GrayImage, RgbImage, RgbaImage};
use std::fs;
use std::path::Path;
use zune_core::colorspace::ColorSpace;
use zune_core::options::DecoderOptions;
use zune_jpeg::JpegDecoder;

fn is_jpeg(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .as_deref(),
        Some("jpg" | "jpeg")
    )
}

/// Decode the image at `path`
pub fn decode_image(path: &Path) -> Result<DynamicImage, FingerprintError> {
    if is_jpeg(path) {
        decode_jpeg(path).or_else(|_| decode_fallback(path))
    } else {
        decode_fallback(path)
    }
}

fn decode_jpeg(path: &Path) -> Result<DynamicImage, FingerprintError> {
    let bytes = fs::read(path).map_err(|source| FingerprintError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let decode_error = |reason: String| FingerprintError::Decode {
        path: path.to_path_buf(),
        reason,
    };

    let options = DecoderOptions::new_fast().jpeg_set_out_colorspace(ColorSpace::RGB);
    let mut decoder = JpegDecoder::new_with_options(&bytes, options);
    let pixels = decoder
        .decode()
        .map_err(|e| decode_error(format!("zune-jpeg decode failed: {:?}", e)))?;
    let info = decoder
        .info()
        .ok_or_else(|| decode_error("missing JPEG header info".to_string()))?;
    let (width, height) = (info.width as u32, info.height as u32);

    let image = match decoder.get_output_colorspace().unwrap_or(ColorSpace::RGB) {
        ColorSpace::RGB => RgbImage::from_raw(width, height, pixels).map(DynamicImage::ImageRgb8),
        ColorSpace::RGBA => {
            RgbaImage::from_raw(width, height, pixels).map(DynamicImage::ImageRgba8)
        }
        ColorSpace::Luma => GrayImage::from_raw(width, height, pixels).map(DynamicImage::ImageLuma8),
        _ => None,
    };

    image.ok_or_else(|| decode_error("unsupported JPEG pixel layout".to_string()))
}

fn decode_fallback(path: &Path) -> Result<DynamicImage, FingerprintError> {
    image::open(path).map_err(|e| FingerprintError::Decode {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}
