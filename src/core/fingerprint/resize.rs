//! Grayscale downscaling for the perceptual hash.
//!
//! Uses fast_image_resize (SIMD where available) with a Lanczos3
//! convolution, so tiny recompression noise averages out before the
//! gradient comparison.

use crate::error::FingerprintError;
use fast_image_resize::{images::Image, FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};
use image::{DynamicImage, GrayImage};

/// Convert to 8-bit grayscale and resize to exactly `width` x `height`
pub fn resize_to_grayscale(
    image: &DynamicImage,
    width: u32,
    height: u32,
) -> Result<GrayImage, FingerprintError> {
    let gray = image.to_luma8();
    let (src_width, src_height) = gray.dimensions();

    if src_width == 0 || src_height == 0 {
        return Err(FingerprintError::Resize("image has no pixels".to_string()));
    }
    if width == 0 || height == 0 {
        return Err(FingerprintError::Resize(format!(
            "invalid target size {}x{}",
            width, height
        )));
    }

    let src_image = Image::from_vec_u8(src_width, src_height, gray.into_raw(), PixelType::U8)
        .map_err(|e| FingerprintError::Resize(e.to_string()))?;
    let mut dst_image = Image::new(width, height, PixelType::U8);

    let options = ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Lanczos3));
    Resizer::new()
        .resize(&src_image, &mut dst_image, &options)
        .map_err(|e| FingerprintError::Resize(e.to_string()))?;

    GrayImage::from_raw(width, height, dst_image.into_vec())
        .ok_or_else(|| FingerprintError::Resize("resized buffer has wrong length".to_string()))
}
