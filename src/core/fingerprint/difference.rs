//! Difference Hash (dHash).
//!
//! 1. Convert to grayscale and resize to (size+1) x size
//! 2. For each row, compare every pixel with its right-hand neighbour
//! 3. Bit is 1 when the left pixel is brighter
//!
//! Bits are taken in row-major order, the first bit being the most
//! significant, and rendered as `ceil(size² / 4)` hex digits. The result
//! survives resizing and recompression but is not unique: visually
//! different images can collide.

use super::decode::decode_image;
use super::resize::resize_to_grayscale;
use crate::error::FingerprintError;
use image::DynamicImage;
use std::path::Path;

/// Grid size used unless configured otherwise
pub const DEFAULT_HASH_SIZE: u32 = 8;

/// Largest accepted grid size (4096 bits)
pub const MAX_HASH_SIZE: u32 = 64;

/// Decode the file and compute its dHash
pub fn difference_hash(path: &Path, hash_size: u32) -> Result<String, FingerprintError> {
    let image = decode_image(path)?;
    difference_hash_image(&image, hash_size)
}

/// Compute the dHash of an already decoded image
pub fn difference_hash_image(
    image: &DynamicImage,
    hash_size: u32,
) -> Result<String, FingerprintError> {
    if !(1..=MAX_HASH_SIZE).contains(&hash_size) {
        return Err(FingerprintError::Resize(format!(
            "hash size {} is outside 1..={}",
            hash_size, MAX_HASH_SIZE
        )));
    }
    let gray = resize_to_grayscale(image, hash_size + 1, hash_size)?;

    let mut bits = Vec::with_capacity((hash_size * hash_size) as usize);
    for y in 0..hash_size {
        for x in 0..hash_size {
            let left = gray.get_pixel(x, y)[0];
            let right = gray.get_pixel(x + 1, y)[0];
            bits.push(left > right);
        }
    }

    Ok(bits_to_hex(&bits))
}

/// Render bits as hex, most significant first, left-padding with zero bits
/// to a whole number of nibbles.
fn bits_to_hex(bits: &[bool]) -> String {
    let pad = (4 - bits.len() % 4) % 4;
    let padded: Vec<bool> = std::iter::repeat(false)
        .take(pad)
        .chain(bits.iter().copied())
        .collect();

    padded
        .chunks(4)
        .map(|nibble| {
            let value = nibble
                .iter()
                .fold(0u32, |acc, &bit| (acc << 1) | u32::from(bit));
            char::from_digit(value, 16).unwrap_or('0')
        })
        .collect()
}
