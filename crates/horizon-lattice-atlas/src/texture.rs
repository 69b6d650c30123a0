//! The atlas pixel buffer.

use image::GrayImage;

use crate::error::{AtlasError, AtlasResult};
use crate::rasterizer::CoverageBitmap;

/// Scale a coverage value by `1 + factor`, saturating at 255.
///
/// The product is truncated, so `factor == 0` returns `value` unchanged.
#[inline]
pub fn brighten_coverage(value: u8, factor: f32) -> u8 {
    let scaled = value as f32 * (factor + 1.0);
    (scaled as u32).min(255) as u8
}

/// A single-channel 8-bit coverage texture.
///
/// The buffer is allocated zeroed at its final size and never resized.
#[derive(Clone, PartialEq, Eq)]
pub struct AtlasTexture {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl AtlasTexture {
    /// Allocate a zeroed texture.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize],
        }
    }

    /// Width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Row-major coverage values, `width` bytes per row.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Take ownership of the coverage values.
    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    /// Coverage at `(x, y)`, or `None` outside the texture.
    pub fn pixel(&self, x: u32, y: u32) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.pixels[self.index(x, y)])
    }

    /// Set the coverage at `(x, y)`. Writes outside the texture are ignored.
    pub fn set_pixel(&mut self, x: u32, y: u32, value: u8) {
        if x < self.width && y < self.height {
            let index = self.index(x, y);
            self.pixels[index] = value;
        }
    }

    /// One row of coverage values.
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.width as usize;
        &self.pixels[start..start + self.width as usize]
    }

    /// Fill a rectangle with a constant value, clipped to the texture.
    pub fn fill_rect(&mut self, x: u32, y: u32, width: u32, height: u32, value: u8) {
        let x_end = x.saturating_add(width).min(self.width);
        let y_end = y.saturating_add(height).min(self.height);
        for yy in y..y_end {
            let start = self.index(x.min(x_end), yy);
            let end = self.index(x_end, yy);
            self.pixels[start..end].fill(value);
        }
    }

    /// Copy a coverage bitmap with its top-left corner at `(x, y)`.
    ///
    /// Rows are read with the bitmap's pitch and written with the texture's
    /// width. With `brighten == 0` rows are copied byte for byte; otherwise
    /// each value goes through [`brighten_coverage`].
    ///
    /// # Errors
    ///
    /// Returns [`AtlasError::BlitOutOfBounds`] if the bitmap does not fit
    /// inside the texture at `(x, y)`. Nothing is written in that case.
    pub fn blit(
        &mut self,
        x: u32,
        y: u32,
        bitmap: &CoverageBitmap,
        brighten: f32,
    ) -> AtlasResult<()> {
        if bitmap.is_empty() {
            return Ok(());
        }
        let fits_x = x
            .checked_add(bitmap.width())
            .is_some_and(|right| right <= self.width);
        let fits_y = y
            .checked_add(bitmap.height())
            .is_some_and(|bottom| bottom <= self.height);
        if !fits_x || !fits_y {
            return Err(AtlasError::BlitOutOfBounds {
                x,
                y,
                width: bitmap.width(),
                height: bitmap.height(),
                texture_width: self.width,
                texture_height: self.height,
            });
        }

        for (row_index, src) in bitmap.rows().enumerate() {
            let start = self.index(x, y + row_index as u32);
            let dst = &mut self.pixels[start..start + src.len()];
            if brighten == 0.0 {
                dst.copy_from_slice(src);
            } else {
                for (out, &value) in dst.iter_mut().zip(src) {
                    *out = brighten_coverage(value, brighten);
                }
            }
        }
        Ok(())
    }

    /// Normalized texture coordinate of the pixel corner `(x, y)`.
    pub fn uv(&self, x: f32, y: f32) -> (f32, f32) {
        (x / self.width as f32, y / self.height as f32)
    }

    /// Expand to RGBA8 with white color and coverage in alpha.
    pub fn to_rgba32(&self) -> Vec<u8> {
        let mut rgba = Vec::with_capacity(self.pixels.len() * 4);
        for &alpha in &self.pixels {
            rgba.extend_from_slice(&[255, 255, 255, alpha]);
        }
        rgba
    }

    /// Copy into an `image` grayscale buffer for inspection.
    pub fn to_gray_image(&self) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            image::Luma([self.pixels[self.index(x, y)]])
        })
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }
}

impl std::fmt::Debug for AtlasTexture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let covered = self.pixels.iter().filter(|&&p| p != 0).count();
        f.debug_struct("AtlasTexture")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("covered_pixels", &covered)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_texture_is_zeroed() {
        let texture = AtlasTexture::new(8, 4);
        assert_eq!(texture.pixels().len(), 32);
        assert!(texture.pixels().iter().all(|&p| p == 0));
        assert_eq!(texture.pixel(8, 0), None);
    }

    #[test]
    fn test_brighten_zero_is_identity() {
        for value in 0..=255u8 {
            assert_eq!(brighten_coverage(value, 0.0), value);
        }
    }

    #[test]
    fn test_brighten_saturates_and_is_monotonic() {
        assert_eq!(brighten_coverage(100, 0.5), 150);
        assert_eq!(brighten_coverage(101, 0.5), 151);
        assert_eq!(brighten_coverage(200, 0.5), 255);
        let mut previous = 0;
        for value in 0..=255u8 {
            let out = brighten_coverage(value, 0.3);
            assert!(out >= previous);
            assert!(out >= value);
            previous = out;
        }
    }

    #[test]
    fn test_blit_uses_pitch_and_stride() {
        let bitmap = CoverageBitmap::new(2, 2, 3, vec![10, 20, 99, 30, 40]).unwrap();
        let mut texture = AtlasTexture::new(4, 4);
        texture.blit(1, 2, &bitmap, 0.0).unwrap();

        assert_eq!(texture.row(0), &[0, 0, 0, 0]);
        assert_eq!(texture.row(1), &[0, 0, 0, 0]);
        assert_eq!(texture.row(2), &[0, 10, 20, 0]);
        assert_eq!(texture.row(3), &[0, 30, 40, 0]);
    }

    #[test]
    fn test_blit_brightens() {
        let bitmap = CoverageBitmap::new(2, 1, 2, vec![100, 200]).unwrap();
        let mut texture = AtlasTexture::new(2, 1);
        texture.blit(0, 0, &bitmap, 1.0).unwrap();
        assert_eq!(texture.row(0), &[200, 255]);
    }

    #[test]
    fn test_blit_out_of_bounds_is_an_error() {
        let bitmap = CoverageBitmap::new(3, 1, 3, vec![1, 2, 3]).unwrap();
        let mut texture = AtlasTexture::new(4, 4);
        assert!(matches!(
            texture.blit(2, 0, &bitmap, 0.0),
            Err(AtlasError::BlitOutOfBounds {
                x: 2,
                width: 3,
                texture_width: 4,
                ..
            })
        ));
        assert!(texture.pixels().iter().all(|&p| p == 0));

        // Coordinates near u32::MAX must not wrap around.
        assert!(texture.blit(0, u32::MAX, &bitmap, 0.0).is_err());
    }

    #[test]
    fn test_fill_rect_clips() {
        let mut texture = AtlasTexture::new(3, 3);
        texture.fill_rect(1, 1, 5, 5, 0xFF);
        assert_eq!(texture.row(0), &[0, 0, 0]);
        assert_eq!(texture.row(1), &[0, 255, 255]);
        assert_eq!(texture.row(2), &[0, 255, 255]);
    }

    #[test]
    fn test_rgba_and_image_views() {
        let mut texture = AtlasTexture::new(2, 1);
        texture.set_pixel(1, 0, 128);

        let rgba = texture.to_rgba32();
        assert_eq!(rgba, vec![255, 255, 255, 0, 255, 255, 255, 128]);

        let image = texture.to_gray_image();
        assert_eq!(image.dimensions(), (2, 1));
        assert_eq!(image.get_pixel(1, 0).0, [128]);
    }

    #[test]
    fn test_uv() {
        let texture = AtlasTexture::new(512, 256);
        assert_eq!(texture.uv(256.0, 64.0), (0.5, 0.25));
    }
}
