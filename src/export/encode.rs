use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder};

use crate::error::EncodeError;
use crate::render::PixelBuffer;

/// Encodes tightly packed RGBA8 pixels as a PNG in memory.
pub fn encode_png(pixels: &PixelBuffer) -> Result<Vec<u8>, EncodeError> {
    let (width, height) = (pixels.width(), pixels.height());
    let expected = width as usize * height as usize * 4;
    if pixels.data().len() != expected {
        return Err(EncodeError::BufferSize {
            width,
            height,
            expected,
            actual: pixels.data().len(),
        });
    }

    let mut png = Vec::new();
    PngEncoder::new_with_quality(&mut png, CompressionType::Fast, FilterType::Adaptive).write_image(
        pixels.data(),
        width,
        height,
        ExtendedColorType::Rgba8,
    )?;
    Ok(png)
}
