//! Minimal RGBA raster with crop and alpha compositing
//!
//! Pixels are stored row-major as `[r, g, b, a]` with straight (not
//! premultiplied) alpha.

mod io;

pub use io::{decode_image, resample};

use crate::types::{Rgba, TRANSPARENT};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    width: u32,
    height: u32,
    pixels: Vec<Rgba>,
}

impl ImageData {
    /// Create an image filled with `color`
    pub fn blank(width: u32, height: u32, color: Rgba) -> Self {
        Self {
            width,
            height,
            pixels: vec![color; width as usize * height as usize],
        }
    }

    /// Create a fully transparent image
    pub fn transparent(width: u32, height: u32) -> Self {
        Self::blank(width, height, TRANSPARENT)
    }

    /// Build from row-major pixels. Returns `None` when the pixel count does
    /// not match the dimensions.
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<Rgba>) -> Option<Self> {
        (pixels.len() == width as usize * height as usize).then_some(Self {
            width,
            height,
            pixels,
        })
    }

    /// Build from rows of pixels; every row must have the same length.
    pub fn from_rows(rows: Vec<Vec<Rgba>>) -> Option<Self> {
        let height = rows.len() as u32;
        let width = rows.first().map_or(0, Vec::len) as u32;
        if rows.iter().any(|row| row.len() as u32 != width) {
            return None;
        }
        Some(Self {
            width,
            height,
            pixels: rows.into_iter().flatten().collect(),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[Rgba] {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.pixels[self.offset(x, y)])
    }

    /// Flat `r, g, b, a` bytes
    pub fn to_rgba_bytes(&self) -> Vec<u8> {
        self.pixels.iter().flatten().copied().collect()
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Copy out the half-open rectangle `x0..x1`, `y0..y1`.
    ///
    /// Coordinates are clamped to the image. When the clamped region is
    /// empty the result is a transparent image sized from the clamped
    /// extents (one or both of which is zero).
    pub fn crop(&self, x0: i64, y0: i64, x1: i64, y1: i64) -> ImageData {
        let clamp_x = |v: i64| v.clamp(0, i64::from(self.width)) as u32;
        let clamp_y = |v: i64| v.clamp(0, i64::from(self.height)) as u32;
        let (x0, x1) = (clamp_x(x0), clamp_x(x1));
        let (y0, y1) = (clamp_y(y0), clamp_y(y1));
        let width = x1.saturating_sub(x0);
        let height = y1.saturating_sub(y0);
        if width == 0 || height == 0 {
            return ImageData::transparent(width, height);
        }

        let mut pixels = Vec::with_capacity(width as usize * height as usize);
        for y in y0..y1 {
            let start = self.offset(x0, y);
            pixels.extend_from_slice(&self.pixels[start..start + width as usize]);
        }
        ImageData {
            width,
            height,
            pixels,
        }
    }

    /// Paint `overlay` over this image with its top-left corner at
    /// (`offset_x`, `offset_y`), using "over" blending.
    ///
    /// Transparent overlay pixels and pixels falling outside this image are
    /// skipped.
    pub fn composite_over(&mut self, overlay: &ImageData, offset_x: i64, offset_y: i64) {
        for y in 0..overlay.height {
            let dest_y = offset_y + i64::from(y);
            if dest_y < 0 || dest_y >= i64::from(self.height) {
                continue;
            }
            for x in 0..overlay.width {
                let dest_x = offset_x + i64::from(x);
                if dest_x < 0 || dest_x >= i64::from(self.width) {
                    continue;
                }
                let src = overlay.pixels[overlay.offset(x, y)];
                if src[3] == 0 {
                    continue;
                }
                let index = self.offset(dest_x as u32, dest_y as u32);
                self.pixels[index] = blend_over(src, self.pixels[index]);
            }
        }
    }
}

/// Blend `src` over `dst` with integer arithmetic.
///
/// `out_a = sa + round(da * (255 - sa) / 255)` and each colour channel is
/// `(s * sa * 255 + d * da * (255 - sa) + out_a * 127) / (out_a * 255)`.
pub fn blend_over(src: Rgba, dst: Rgba) -> Rgba {
    let sa = u32::from(src[3]);
    let da = u32::from(dst[3]);
    let inv_a = 255 - sa;
    let out_a = sa + (da * inv_a + 127) / 255;
    if out_a == 0 {
        return TRANSPARENT;
    }
    let denominator = out_a * 255;
    let channel = |s: u8, d: u8| -> u8 {
        let numerator = u32::from(s) * sa * 255 + u32::from(d) * da * inv_a + out_a * 127;
        (numerator / denominator).min(255) as u8
    };
    [
        channel(src[0], dst[0]),
        channel(src[1], dst[1]),
        channel(src[2], dst[2]),
        out_a.min(255) as u8,
    ]
}

/// Composite images onto a transparent canvas, later entries on top.
pub fn composite_layers<'a>(
    canvas_size: (u32, u32),
    layers: impl IntoIterator<Item = (&'a ImageData, (i64, i64))>,
) -> ImageData {
    let mut canvas = ImageData::transparent(canvas_size.0, canvas_size.1);
    for (image, (x0, y0)) in layers {
        canvas.composite_over(image, x0, y0);
    }
    canvas
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker() -> ImageData {
        ImageData::from_rows(vec![
            vec![[1, 1, 1, 255], [2, 2, 2, 255]],
            vec![[3, 3, 3, 255], [4, 4, 4, 255]],
        ])
        .unwrap()
    }

    #[test]
    fn test_composite_opaque_pixel() {
        let mut base = ImageData::transparent(2, 1);
        let overlay = ImageData::blank(1, 1, [255, 0, 0, 255]);
        base.composite_over(&overlay, 1, 0);

        assert_eq!(base.pixel(0, 0), Some([0, 0, 0, 0]));
        assert_eq!(base.pixel(1, 0), Some([255, 0, 0, 255]));
    }

    #[test]
    fn test_half_alpha_over_opaque() {
        let out = blend_over([255, 0, 0, 128], [0, 0, 255, 255]);
        // out_a = 128 + round(255 * 127 / 255) = 255
        assert_eq!(out[3], 255);
        // r = (255*128*255 + 0 + 255*127) / (255*255) = 128
        assert_eq!(out[0], 128);
        // b = (0 + 255*255*127 + 255*127) / (255*255) = 127
        assert_eq!(out[2], 127);
    }

    #[test]
    fn test_half_alpha_over_transparent() {
        let out = blend_over([200, 100, 50, 128], TRANSPARENT);
        assert_eq!(out, [200, 100, 50, 128]);
    }

    #[test]
    fn test_opaque_overlay_is_idempotent() {
        let overlay = ImageData::from_rows(vec![
            vec![[10, 20, 30, 255], [0, 0, 0, 0]],
            vec![[90, 80, 70, 255], [5, 6, 7, 255]],
        ])
        .unwrap();
        let mut once = ImageData::blank(3, 3, [50, 60, 70, 100]);
        once.composite_over(&overlay, 1, 1);
        let mut twice = once.clone();
        twice.composite_over(&overlay, 1, 1);

        assert_eq!(once, twice);
    }

    #[test]
    fn test_composite_skips_out_of_bounds() {
        let mut base = ImageData::transparent(2, 2);
        let overlay = ImageData::blank(2, 2, [9, 9, 9, 255]);
        base.composite_over(&overlay, -1, 1);

        assert_eq!(base.pixel(0, 1), Some([9, 9, 9, 255]));
        assert_eq!(base.pixel(1, 1), Some(TRANSPARENT));
        assert_eq!(base.pixel(0, 0), Some(TRANSPARENT));
    }

    #[test]
    fn test_crop_bounds() {
        let cropped = checker().crop(1, 0, 2, 1);

        assert_eq!(cropped.width(), 1);
        assert_eq!(cropped.height(), 1);
        assert_eq!(cropped.pixel(0, 0), Some([2, 2, 2, 255]));
    }

    #[test]
    fn test_crop_clamps_partial_overlap() {
        let cropped = checker().crop(-5, 1, 10, 10);

        assert_eq!((cropped.width(), cropped.height()), (2, 1));
        assert_eq!(cropped.pixel(1, 0), Some([4, 4, 4, 255]));
    }

    #[test]
    fn test_crop_out_of_range_is_empty_and_transparent() {
        let image = checker();

        let cropped = image.crop(5, 5, 9, 9);
        assert_eq!((cropped.width(), cropped.height()), (0, 0));
        assert!(cropped.pixels().is_empty());

        // Width survives clamping, height collapses
        let cropped = image.crop(0, 3, 2, 8);
        assert_eq!((cropped.width(), cropped.height()), (2, 0));

        let cropped = image.crop(2, 0, 1, 2);
        assert_eq!(cropped.width(), 0);
    }

    #[test]
    fn test_composite_layers_order() {
        let red = ImageData::blank(1, 1, [255, 0, 0, 255]);
        let blue = ImageData::blank(1, 1, [0, 0, 255, 255]);

        let merged = composite_layers((2, 1), [(&red, (0, 0)), (&blue, (1, 0))]);
        assert_eq!(merged.pixel(0, 0), Some([255, 0, 0, 255]));
        assert_eq!(merged.pixel(1, 0), Some([0, 0, 255, 255]));

        let merged = composite_layers((1, 1), [(&red, (0, 0)), (&blue, (0, 0))]);
        assert_eq!(merged.pixel(0, 0), Some([0, 0, 255, 255]));
    }

    #[test]
    fn test_from_rows_rejects_ragged() {
        assert!(ImageData::from_rows(vec![vec![TRANSPARENT; 2], vec![TRANSPARENT; 1]]).is_none());
        assert!(ImageData::from_pixels(2, 2, vec![TRANSPARENT; 3]).is_none());
    }
}
