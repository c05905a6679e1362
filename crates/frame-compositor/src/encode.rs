//! Lossless encoding of compositor output.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder, RgbaImage};

use crate::frame::Dimensions;

/// MIME type of every encoded composite.
pub const PNG_MIME: &str = "image/png";

/// Encode an RGBA buffer as PNG at maximum compression.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    PngEncoder::new_with_quality(&mut buf, CompressionType::Best, FilterType::Adaptive)
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            ExtendedColorType::Rgba8,
        )?;
    Ok(buf)
}

/// The finished composite: physical pixels plus the logical size they represent.
#[derive(Debug, Clone)]
pub struct CompositeOutput {
    image: RgbaImage,
    logical: Dimensions,
    pixel_ratio: f32,
}

impl CompositeOutput {
    pub(crate) fn new(image: RgbaImage, logical: Dimensions, pixel_ratio: f32) -> Self {
        Self {
            image,
            logical,
            pixel_ratio,
        }
    }

    /// Physical width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Physical height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn logical_size(&self) -> Dimensions {
        self.logical
    }

    pub fn pixel_ratio(&self) -> f32 {
        self.pixel_ratio
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    pub fn encode_png(&self) -> Result<Vec<u8>, image::ImageError> {
        encode_png(&self.image)
    }

    /// `data:image/png;base64,...` form for hosts that hand the image to a browser.
    pub fn to_data_uri(&self) -> Result<String, image::ImageError> {
        let png = self.encode_png()?;
        Ok(format!("data:{PNG_MIME};base64,{}", STANDARD.encode(png)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn output() -> CompositeOutput {
        let image = RgbaImage::from_fn(6, 4, |x, y| Rgba([x as u8 * 40, y as u8 * 60, 7, 200]));
        CompositeOutput::new(
            image,
            Dimensions {
                width: 3,
                height: 2,
            },
            2.0,
        )
    }

    #[test]
    fn test_png_round_trip_is_exact() {
        let out = output();
        let png = out.encode_png().unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
        let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(&decoded, out.image());
    }

    #[test]
    fn test_data_uri_prefix() {
        let uri = output().to_data_uri().unwrap();
        assert!(uri.starts_with("data:image/png;base64,iVBORw0KGgo"));
    }

    #[test]
    fn test_reports_physical_and_logical_size() {
        let out = output();
        assert_eq!((out.width(), out.height()), (6, 4));
        assert_eq!(out.logical_size().width, 3);
        assert_eq!(out.pixel_ratio(), 2.0);
    }
}
