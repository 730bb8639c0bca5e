//! Decoded texture → PNG conversion
//!
//! Decoded textures are stored bottom row first with alpha that may exceed
//! 1.0. Image buffers are top row first, so rows are flipped back here.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use image::{ImageBuffer, Rgba, Rgba32FImage, RgbaImage, imageops};

use crate::error::{Error, Result};
use crate::formats::tim2::Texture;

/// Convert to 8-bit RGBA, clamping overbright channels.
///
/// # Errors
/// Returns an error if the pixel count does not match the dimensions.
pub fn texture_to_rgba8(texture: &Texture) -> Result<RgbaImage> {
    let raw: Vec<u8> = texture
        .pixels
        .iter()
        .flatten()
        .map(|&c| (c.clamp(0.0, 1.0) * 255.0).round() as u8)
        .collect();
    let mut image: RgbaImage = ImageBuffer::from_raw(texture.width, texture.height, raw)
        .ok_or_else(|| Error::ImageBufferFailed {
            texture: texture.name.clone(),
        })?;
    imageops::flip_vertical_in_place(&mut image);
    Ok(image)
}

/// Convert to 32-bit float RGBA, keeping overbright values.
///
/// # Errors
/// Returns an error if the pixel count does not match the dimensions.
pub fn texture_to_rgba32f(texture: &Texture) -> Result<Rgba32FImage> {
    let mut image: ImageBuffer<Rgba<f32>, Vec<f32>> =
        ImageBuffer::from_raw(texture.width, texture.height, texture.rgba()).ok_or_else(|| {
            Error::ImageBufferFailed {
                texture: texture.name.clone(),
            }
        })?;
    imageops::flip_vertical_in_place(&mut image);
    Ok(image)
}

/// Encode a texture as PNG bytes.
///
/// # Errors
/// Returns an error if the image buffer cannot be built or encoding fails.
pub fn texture_to_png_bytes(texture: &Texture) -> Result<Vec<u8>> {
    let image = texture_to_rgba8(texture)?;
    let mut png_data = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut png_data);
    image.write_with_encoder(encoder).map_err(|e| Error::PngEncodeFailed {
        message: e.to_string(),
    })?;
    Ok(png_data)
}

/// Write a texture to `path` as PNG.
///
/// # Errors
/// Returns an error if encoding or writing the file fails.
pub fn save_texture_png<P: AsRef<Path>>(texture: &Texture, path: P) -> Result<()> {
    let png_data = texture_to_png_bytes(texture)?;
    let mut output = BufWriter::new(File::create(path.as_ref())?);
    output.write_all(&png_data)?;
    output.flush()?;
    Ok(())
}
