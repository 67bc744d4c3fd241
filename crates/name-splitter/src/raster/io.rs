//! Raster decode/encode through the `image` crate

use super::ImageData;
use crate::types::*;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, RgbaImage};
use std::path::Path;

/// Decode any supported raster file into RGBA pixels.
pub fn decode_image(path: &Path) -> Result<ImageData> {
    if !path.exists() {
        return Err(SplitError::ImageRead(format!(
            "Image not found: {}",
            path.display()
        )));
    }
    let decoded = image::open(path).map_err(|e| {
        SplitError::ImageRead(format!("Failed to read image: {}: {e}", path.display()))
    })?;
    Ok(ImageData::from_rgba_image(decoded.to_rgba8()))
}

/// Resample to `width` x `height` (each at least one pixel) with Lanczos3.
pub fn resample(image: &ImageData, width: u32, height: u32) -> ImageData {
    let (width, height) = (width.max(1), height.max(1));
    if image.width() == 0 || image.height() == 0 {
        return ImageData::transparent(width, height);
    }
    if (width, height) == (image.width(), image.height()) {
        return image.clone();
    }
    let resized = image::imageops::resize(&image.to_rgba_image(), width, height, FilterType::Lanczos3);
    ImageData::from_rgba_image(resized)
}

impl ImageData {
    pub fn from_rgba_image(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        let pixels = image.pixels().map(|p| p.0).collect();
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn to_rgba_image(&self) -> RgbaImage {
        // Dimensions and buffer length always agree, so from_raw cannot fail
        RgbaImage::from_raw(self.width, self.height, self.to_rgba_bytes())
            .unwrap_or_else(|| RgbaImage::new(self.width, self.height))
    }

    /// Encode to `path`, choosing the format from its extension.
    ///
    /// Formats without an alpha channel (jpeg, ppm) receive RGB data.
    pub fn save(&self, path: &Path) -> Result<()> {
        let format = ImageFormat::from_path(path)?;
        let rgba = DynamicImage::ImageRgba8(self.to_rgba_image());
        match format {
            ImageFormat::Jpeg | ImageFormat::Pnm => {
                DynamicImage::ImageRgb8(rgba.to_rgb8()).save_with_format(path, format)?
            }
            _ => rgba.save_with_format(path, format)?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_png_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tile.png");
        let image = ImageData::from_rows(vec![
            vec![[255, 0, 0, 255], [0, 255, 0, 128]],
            vec![[0, 0, 255, 0], [10, 20, 30, 40]],
        ])
        .unwrap();

        image.save(&path).unwrap();
        let decoded = decode_image(&path).unwrap();

        assert_eq!(decoded, image);
    }

    #[test]
    fn test_jpeg_drops_alpha() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tile.jpg");
        ImageData::blank(4, 4, [200, 200, 200, 100]).save(&path).unwrap();

        let decoded = decode_image(&path).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (4, 4));
        assert!(decoded.pixels().iter().all(|p| p[3] == 255));
    }

    #[test]
    fn test_missing_file() {
        let err = decode_image(Path::new("/nonexistent/missing.png")).unwrap_err();
        assert!(matches!(err, SplitError::ImageRead(ref msg) if msg.starts_with("Image not found")));
    }

    #[test]
    fn test_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"not a png").unwrap();

        let err = decode_image(&path).unwrap_err();
        assert!(matches!(err, SplitError::ImageRead(ref msg) if msg.starts_with("Failed to read image")));
    }

    #[test]
    fn test_resample_size() {
        let image = ImageData::blank(10, 6, [1, 2, 3, 255]);

        let resized = resample(&image, 5, 3);
        assert_eq!((resized.width(), resized.height()), (5, 3));

        let resized = resample(&image, 0, 0);
        assert_eq!((resized.width(), resized.height()), (1, 1));
    }
}
