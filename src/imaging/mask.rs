//! Inpainting mask for room photos.
//!
//! The upper part of a listing photo (ceiling, upper walls, windows) is never
//! handed to the generator. Black rows are preserved, white rows are
//! regenerated, and a short linear ramp between them avoids a visible seam.

use crate::config::MaskConfig;
use crate::error::{Result, StagingError};
use crate::imaging::transform::encode_data_uri;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, GrayImage, ImageEncoder, Luma};

pub const PRESERVE: u8 = 0;
pub const REPLACE: u8 = 255;

/// Mask intensity for row `y` of an image `height` rows tall.
pub fn row_value(y: u32, height: u32, config: &MaskConfig) -> u8 {
    let fraction = y as f32 / height.max(1) as f32;
    if fraction < config.preserve_until {
        PRESERVE
    } else if fraction >= config.ramp_until {
        REPLACE
    } else {
        let t = (fraction - config.preserve_until) / (config.ramp_until - config.preserve_until);
        (t * REPLACE as f32).round().clamp(0.0, REPLACE as f32) as u8
    }
}

/// A mask needs at least two rows: the top row is preserved and the bottom row replaced.
pub fn generate_mask(width: u32, height: u32, config: &MaskConfig) -> Result<GrayImage> {
    if width == 0 || height < 2 {
        return Err(StagingError::Image(format!(
            "cannot build a {}x{} mask",
            width, height
        )));
    }
    config.validate()?;

    let rows: Vec<u8> = (0..height).map(|y| row_value(y, height, config)).collect();
    Ok(GrayImage::from_fn(width, height, |_, y| {
        Luma([rows[y as usize]])
    }))
}

pub fn encode_png(mask: &GrayImage) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    PngEncoder::new(&mut buf).write_image(
        mask.as_raw(),
        mask.width(),
        mask.height(),
        ExtendedColorType::L8,
    )?;
    Ok(buf)
}

/// PNG mask as a `data:` URI, ready to be sent as a model input.
pub fn mask_data_uri(width: u32, height: u32, config: &MaskConfig) -> Result<String> {
    let mask = generate_mask(width, height, config)?;
    let png = encode_png(&mask)?;
    log::debug!("Generated {}x{} inpainting mask ({} bytes)", width, height, png.len());
    Ok(encode_data_uri(&png, "image/png"))
}
