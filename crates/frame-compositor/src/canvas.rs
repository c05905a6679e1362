//! Pixel-ratio aware drawing surface.
//!
//! The backing buffer holds `logical * pixel_ratio` physical pixels while
//! every draw call is addressed in logical units, so composites stay sharp on
//! high-density displays without the caller doing any scaling.

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use tracing::debug;

use crate::encode::CompositeOutput;
use crate::error::ComposeError;
use crate::frame::Dimensions;

/// Largest device pixel ratio a canvas may be allocated at.
pub const MAX_PIXEL_RATIO: f32 = 8.0;

/// A physical-pixel rectangle, possibly reaching outside the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhysicalRect {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

/// Drawing surface for one composite attempt.
#[derive(Debug, Clone)]
pub struct Canvas {
    buffer: RgbaImage,
    logical: Dimensions,
    pixel_ratio: f32,
}

impl Canvas {
    /// Allocate a cleared canvas of `logical` size at `pixel_ratio`.
    pub fn new(logical: Dimensions, pixel_ratio: f32) -> Result<Self, ComposeError> {
        check_pixel_ratio(pixel_ratio)?;
        let scale = f64::from(pixel_ratio);
        let width = (f64::from(logical.width) * scale).round().max(1.0) as u32;
        let height = (f64::from(logical.height) * scale).round().max(1.0) as u32;
        debug!(
            logical_w = logical.width,
            logical_h = logical.height,
            pixel_ratio,
            width,
            height,
            "Allocating canvas"
        );

        Ok(Self {
            buffer: RgbaImage::new(width, height),
            logical,
            pixel_ratio,
        })
    }

    pub fn logical_size(&self) -> Dimensions {
        self.logical
    }

    pub fn physical_size(&self) -> (u32, u32) {
        self.buffer.dimensions()
    }

    pub fn pixel_ratio(&self) -> f32 {
        self.pixel_ratio
    }

    pub fn buffer(&self) -> &RgbaImage {
        &self.buffer
    }

    pub(crate) fn buffer_mut(&mut self) -> &mut RgbaImage {
        &mut self.buffer
    }

    /// Reset every pixel to transparent.
    pub fn clear(&mut self) {
        for pixel in self.buffer.pixels_mut() {
            *pixel = Rgba([0, 0, 0, 0]);
        }
    }

    /// Convert a logical rectangle to physical pixels.
    ///
    /// Edges are rounded independently so adjacent rectangles stay adjacent.
    pub fn physical_rect(&self, x: f64, y: f64, width: f64, height: f64) -> PhysicalRect {
        let s = f64::from(self.pixel_ratio);
        let x0 = (x * s).round();
        let y0 = (y * s).round();
        let x1 = ((x + width) * s).round();
        let y1 = ((y + height) * s).round();
        PhysicalRect {
            x: x0 as i64,
            y: y0 as i64,
            width: (x1 - x0).max(0.0) as u32,
            height: (y1 - y0).max(0.0) as u32,
        }
    }

    /// Draw `image` stretched over the logical rectangle, alpha-composited.
    ///
    /// The image is resampled with Lanczos3 only when its size differs from
    /// the physical destination.
    pub fn draw_image(&mut self, image: &RgbaImage, x: f64, y: f64, width: f64, height: f64) {
        let dest = self.physical_rect(x, y, width, height);
        if dest.width == 0 || dest.height == 0 || image.width() == 0 || image.height() == 0 {
            return;
        }

        if image.dimensions() == (dest.width, dest.height) {
            overlay(&mut self.buffer, image, dest.x, dest.y);
        } else {
            debug!(
                src_w = image.width(),
                src_h = image.height(),
                dest_w = dest.width,
                dest_h = dest.height,
                "Resampling layer to destination"
            );
            let resized = imageops::resize(image, dest.width, dest.height, FilterType::Lanczos3);
            overlay(&mut self.buffer, &resized, dest.x, dest.y);
        }
    }

    pub fn into_output(self) -> CompositeOutput {
        CompositeOutput::new(self.buffer, self.logical, self.pixel_ratio)
    }
}

/// Reject ratios that are non-finite, non-positive or above [`MAX_PIXEL_RATIO`].
pub(crate) fn check_pixel_ratio(pixel_ratio: f32) -> Result<(), ComposeError> {
    if pixel_ratio.is_finite() && pixel_ratio > 0.0 && pixel_ratio <= MAX_PIXEL_RATIO {
        Ok(())
    } else {
        Err(ComposeError::InvalidPixelRatio(pixel_ratio))
    }
}

/// Composite `top` over `base` at the given position (source-over).
///
/// Pixels falling outside `base` are skipped.
pub fn overlay(base: &mut RgbaImage, top: &RgbaImage, x: i64, y: i64) {
    let (base_w, base_h) = (i64::from(base.width()), i64::from(base.height()));
    for (dx, dy, pixel) in top.enumerate_pixels() {
        let target_x = x + i64::from(dx);
        let target_y = y + i64::from(dy);
        if target_x < 0 || target_y < 0 || target_x >= base_w || target_y >= base_h {
            continue;
        }
        let (tx, ty) = (target_x as u32, target_y as u32);
        match pixel[3] {
            0 => {}
            255 => base.put_pixel(tx, ty, *pixel),
            _ => {
                let blended = blend_pixel(base.get_pixel(tx, ty), pixel);
                base.put_pixel(tx, ty, blended);
            }
        }
    }
}

fn blend_pixel(bg: &Rgba<u8>, fg: &Rgba<u8>) -> Rgba<u8> {
    let fa = f32::from(fg[3]) / 255.0;
    let ba = f32::from(bg[3]) / 255.0;
    let out_a = fa + ba * (1.0 - fa);
    if out_a <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }
    let channel = |i: usize| {
        let c = (f32::from(fg[i]) * fa + f32::from(bg[i]) * ba * (1.0 - fa)) / out_a;
        c.round().clamp(0.0, 255.0) as u8
    };
    Rgba([
        channel(0),
        channel(1),
        channel(2),
        (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims(width: u32, height: u32) -> Dimensions {
        Dimensions { width, height }
    }

    #[test]
    fn test_backing_buffer_scales_with_ratio() {
        for ratio in [1.0f32, 2.0, 3.0] {
            let canvas = Canvas::new(dims(120, 80), ratio).unwrap();
            let r = ratio as u32;
            assert_eq!(canvas.physical_size(), (120 * r, 80 * r));
            assert_eq!(canvas.logical_size(), dims(120, 80));
        }
    }

    #[test]
    fn test_fractional_ratio_rounds_buffer() {
        let canvas = Canvas::new(dims(101, 33), 1.5).unwrap();
        assert_eq!(canvas.physical_size(), (152, 50));
    }

    #[test]
    fn test_invalid_ratio_rejected() {
        for ratio in [0.0f32, -1.0, f32::NAN, f32::INFINITY, 8.5, 500.0] {
            assert!(matches!(
                Canvas::new(dims(10, 10), ratio),
                Err(ComposeError::InvalidPixelRatio(_))
            ));
        }
    }

    #[test]
    fn test_max_ratio_is_accepted() {
        let canvas = Canvas::new(dims(10, 10), MAX_PIXEL_RATIO).unwrap();
        assert_eq!(canvas.physical_size(), (80, 80));
    }

    #[test]
    fn test_full_logical_draw_fills_physical_buffer() {
        let mut canvas = Canvas::new(dims(40, 30), 2.0).unwrap();
        let layer = RgbaImage::from_pixel(40, 30, Rgba([200, 10, 10, 255]));
        canvas.draw_image(&layer, 0.0, 0.0, 40.0, 30.0);
        assert_eq!(canvas.physical_size(), (80, 60));
        assert!(canvas.buffer().pixels().all(|p| p[3] == 255));
    }

    #[test]
    fn test_logical_offsets_are_scaled() {
        let mut canvas = Canvas::new(dims(10, 10), 2.0).unwrap();
        let layer = RgbaImage::from_pixel(4, 4, Rgba([1, 2, 3, 255]));
        canvas.draw_image(&layer, 3.0, 4.0, 2.0, 2.0);
        assert_eq!(canvas.buffer().get_pixel(6, 8), &Rgba([1, 2, 3, 255]));
        assert_eq!(canvas.buffer().get_pixel(9, 11), &Rgba([1, 2, 3, 255]));
        assert_eq!(canvas.buffer().get_pixel(5, 8)[3], 0);
        assert_eq!(canvas.buffer().get_pixel(10, 12)[3], 0);
    }

    #[test]
    fn test_transparent_pixels_leave_base_untouched() {
        let mut base = RgbaImage::from_pixel(4, 4, Rgba([9, 8, 7, 255]));
        let top = RgbaImage::new(4, 4);
        overlay(&mut base, &top, 0, 0);
        assert!(base.pixels().all(|p| *p == Rgba([9, 8, 7, 255])));
    }

    #[test]
    fn test_half_alpha_blends() {
        let mut base = RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 255]));
        let top = RgbaImage::from_pixel(1, 1, Rgba([255, 255, 255, 128]));
        overlay(&mut base, &top, 0, 0);
        let p = base.get_pixel(0, 0);
        assert_eq!(p[3], 255);
        assert!((127..=129).contains(&p[0]), "got {p:?}");
    }

    #[test]
    fn test_overlay_clips_out_of_bounds() {
        let mut base = RgbaImage::new(10, 10);
        let top = RgbaImage::from_pixel(5, 5, Rgba([1, 1, 1, 255]));
        overlay(&mut base, &top, 8, -3);
        assert_eq!(base.get_pixel(9, 0), &Rgba([1, 1, 1, 255]));
        assert_eq!(base.get_pixel(9, 2)[3], 0);
    }

    #[test]
    fn test_clear_resets_pixels() {
        let mut canvas = Canvas::new(dims(4, 4), 1.0).unwrap();
        let layer = RgbaImage::from_pixel(4, 4, Rgba([5, 5, 5, 255]));
        canvas.draw_image(&layer, 0.0, 0.0, 4.0, 4.0);
        canvas.clear();
        assert!(canvas.buffer().pixels().all(|p| p[3] == 0));
    }
}
