//! The fixed-resolution drawing surface.

use std::sync::{Arc, Mutex};

use image::{Rgba, RgbaImage};

/// Opaque black, the surface background.
pub const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// RGBA pixel buffer the compositor draws into.
#[derive(Debug, Clone)]
pub struct Surface {
    image: RgbaImage,
}

/// Surface shared between the render loop and the export sampler.
pub type SharedSurface = Arc<Mutex<Surface>>;

impl Surface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::from_pixel(width.max(1), height.max(1), BLACK),
        }
    }

    /// Wrap in the shared handle used across tasks.
    pub fn shared(width: u32, height: u32) -> SharedSurface {
        Arc::new(Mutex::new(Self::new(width, height)))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Resize the backing buffer if the dimensions differ.
    /// Returns whether a reallocation happened.
    pub fn ensure_size(&mut self, width: u32, height: u32) -> bool {
        let (width, height) = (width.max(1), height.max(1));
        if self.image.dimensions() == (width, height) {
            return false;
        }
        tracing::debug!(width, height, "Reallocating drawing surface");
        self.image = RgbaImage::from_pixel(width, height, BLACK);
        true
    }

    pub fn clear_black(&mut self) {
        for pixel in self.image.pixels_mut() {
            *pixel = BLACK;
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn image_mut(&mut self) -> &mut RgbaImage {
        &mut self.image
    }

    /// Owned copy of the current pixels.
    pub fn snapshot(&self) -> RgbaImage {
        self.image.clone()
    }
}

/// Source-over blend of `src` onto `dst`, with `src`'s alpha scaled by
/// `opacity`. The destination stays opaque.
pub(crate) fn blend_over(dst: &mut Rgba<u8>, src: Rgba<u8>, opacity: f32) {
    let a = (src.0[3] as f32 / 255.0) * opacity.clamp(0.0, 1.0);
    if a <= 0.0 {
        return;
    }
    if a >= 1.0 {
        *dst = Rgba([src.0[0], src.0[1], src.0[2], 255]);
        return;
    }
    for c in 0..3 {
        let mixed = src.0[c] as f32 * a + dst.0[c] as f32 * (1.0 - a);
        dst.0[c] = mixed.round().clamp(0.0, 255.0) as u8;
    }
    dst.0[3] = 255;
}

/// Blend a solid color over an axis-aligned rectangle, clipped to the image.
pub(crate) fn fill_rect(image: &mut RgbaImage, x: i64, y: i64, w: u32, h: u32, color: Rgba<u8>) {
    let (iw, ih) = (image.width() as i64, image.height() as i64);
    let x0 = x.clamp(0, iw);
    let y0 = y.clamp(0, ih);
    let x1 = (x + w as i64).clamp(0, iw);
    let y1 = (y + h as i64).clamp(0, ih);
    for py in y0..y1 {
        for px in x0..x1 {
            blend_over(image.get_pixel_mut(px as u32, py as u32), color, 1.0);
        }
    }
}
