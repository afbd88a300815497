/*!
# Bitmap Loading

Decodes encoded tile images (PNG, JPEG) into an in-memory RGBA8 buffer.

All bitmaps handled by the renderer store **premultiplied alpha** in RGBA byte
order; the compositor relies on it. Decoded images are converted once, here.
*/

use image::{Rgba, RgbaImage};

use crate::error::{RenderError, RenderResult};

/// Decoded tile image, premultiplied RGBA8
#[derive(Debug, Clone, PartialEq)]
pub struct Bitmap {
    pixels: RgbaImage,
}

impl Bitmap {
    /// Decode raw image bytes. The format is sniffed from the data.
    pub fn decode(bytes: &[u8]) -> RenderResult<Self> {
        if bytes.is_empty() {
            return Err(RenderError::decode("empty image data"));
        }

        let image = image::load_from_memory(bytes)?;
        let rgba = image.to_rgba8();
        if rgba.width() == 0 || rgba.height() == 0 {
            return Err(RenderError::decode("image has no pixels"));
        }

        Ok(Self::from_rgba(rgba))
    }

    /// Wrap a straight-alpha image, premultiplying every pixel
    pub fn from_rgba(mut image: RgbaImage) -> Self {
        for pixel in image.pixels_mut() {
            *pixel = premultiply(*pixel);
        }
        Self { pixels: image }
    }

    /// Wrap an image whose pixels are already premultiplied
    pub fn from_premultiplied(image: RgbaImage) -> Self {
        Self { pixels: image }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Premultiplied texel, `None` outside the bitmap
    pub fn texel(&self, x: u32, y: u32) -> Option<Rgba<u8>> {
        self.pixels.get_pixel_checked(x, y).copied()
    }

    pub fn as_image(&self) -> &RgbaImage {
        &self.pixels
    }
}

/// `a * b / 255`, rounded
pub(crate) fn mul_div255(a: u8, b: u8) -> u8 {
    ((a as u32 * b as u32 + 127) / 255) as u8
}

pub(crate) fn premultiply(pixel: Rgba<u8>) -> Rgba<u8> {
    let [r, g, b, a] = pixel.0;
    Rgba([mul_div255(r, a), mul_div255(g, a), mul_div255(b, a), a])
}

pub(crate) fn unpremultiply(pixel: Rgba<u8>) -> Rgba<u8> {
    let [r, g, b, a] = pixel.0;
    if a == 0 {
        return Rgba([0, 0, 0, 0]);
    }
    let restore = |c: u8| ((c as u32 * 255 + a as u32 / 2) / a as u32).min(255) as u8;
    Rgba([restore(r), restore(g), restore(b), a])
}
