//! Texture image decoding

use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TextureError {
    #[error("Image decode error: {0}")]
    Decode(#[from] image::ImageError),
    #[error("Invalid texture: {0}")]
    InvalidFormat(String),
}

/// Decoded RGBA8 pixel data ready for staging upload
pub struct TextureData {
    /// Tightly packed RGBA8 pixels, row major
    pub pixels: Vec<u8>,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl TextureData {
    /// Decode an image file into RGBA8 pixels
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, TextureError> {
        let decoded = image::open(path)?.to_rgba8();
        let (width, height) = decoded.dimensions();

        if width == 0 || height == 0 {
            return Err(TextureError::InvalidFormat(
                "texture has zero extent".to_string(),
            ));
        }

        Ok(Self {
            pixels: decoded.into_raw(),
            width,
            height,
        })
    }

    /// Size of the pixel data in bytes
    pub fn byte_size(&self) -> u64 {
        self.pixels.len() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_size_is_four_per_pixel() {
        let data = TextureData {
            pixels: vec![0u8; 2 * 3 * 4],
            width: 2,
            height: 3,
        };
        assert_eq!(data.byte_size(), 24);
    }
}
