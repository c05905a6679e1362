//! Crop rasterization: display-space selection to placement-sized pixels.
//!
//! Maps a committed crop from the coordinates of the displayed photo to the
//! photo's native pixels, extracts that region and resamples it to exactly
//! the placement rectangle's size in one step.

use std::sync::Arc;

use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbaImage};
use tracing::debug;

use crate::crop::CommittedCrop;
use crate::encode;
use crate::error::CropError;
use crate::geometry::{CropRect, DisplaySize};

/// A decoded user photo together with the size it is displayed at.
#[derive(Debug, Clone)]
pub struct SourceImage {
    image: Arc<RgbaImage>,
    display: DisplaySize,
}

impl SourceImage {
    pub fn new(image: DynamicImage, display: DisplaySize) -> Self {
        Self::from_rgba(image.to_rgba8(), display)
    }

    pub fn from_rgba(image: RgbaImage, display: DisplaySize) -> Self {
        Self {
            image: Arc::new(image),
            display,
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Native pixel size of the photo.
    pub fn natural_size(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn display_size(&self) -> DisplaySize {
        self.display
    }

    pub fn set_display_size(&mut self, display: DisplaySize) {
        self.display = display;
    }
}

/// Crop rectangle in native image pixels, before snapping to whole pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NativeRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Map a display-space selection to native image coordinates.
pub fn to_native(selection: CropRect, natural: (u32, u32), display: DisplaySize) -> NativeRect {
    let scale_x = f64::from(natural.0) / display.width;
    let scale_y = f64::from(natural.1) / display.height;
    NativeRect {
        x: selection.x * scale_x,
        y: selection.y * scale_y,
        width: selection.width * scale_x,
        height: selection.height * scale_y,
    }
}

/// The photo crop, pre-sized to the placement rectangle.
#[derive(Debug, Clone)]
pub struct RasterizedCrop {
    image: Arc<RgbaImage>,
}

impl RasterizedCrop {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Shared handle to the pixels, suitable for a compositor layer.
    pub fn shared(&self) -> Arc<RgbaImage> {
        Arc::clone(&self.image)
    }

    /// Lossless PNG encoding of the crop.
    pub fn encode_png(&self) -> Result<Vec<u8>, image::ImageError> {
        encode::encode_png(&self.image)
    }
}

/// Extract the committed crop from `source` and resize it to `target`.
///
/// The committed crop must have been made against the photo's current
/// display size. The native region is snapped to whole pixels before
/// extraction, so its aspect may differ from the selection by up to one pixel
/// per edge. Resampling uses Lanczos3; when the extracted region already has
/// the target size it is copied as-is.
pub fn rasterize_crop(
    source: &SourceImage,
    crop: &CommittedCrop,
    target: (u32, u32),
) -> Result<RasterizedCrop, CropError> {
    let (target_w, target_h) = target;
    if target_w == 0 || target_h == 0 {
        return Err(CropError::EmptyTarget {
            width: target_w,
            height: target_h,
        });
    }

    let (natural_w, natural_h) = source.natural_size();
    if natural_w == 0 || natural_h == 0 {
        return Err(CropError::EmptySource);
    }

    let display = source.display_size();
    if display.is_degenerate() || crop.display() != display {
        return Err(CropError::StaleSelection {
            committed_width: crop.display().width,
            committed_height: crop.display().height,
            display_width: display.width,
            display_height: display.height,
        });
    }

    let native = to_native(crop.rect(), (natural_w, natural_h), display);
    let (x, width) = snap_span(native.x, native.width, natural_w);
    let (y, height) = snap_span(native.y, native.height, natural_h);

    let region = imageops::crop_imm(source.image(), x, y, width, height).to_image();
    let image = if (width, height) == target {
        debug!(width, height, "Crop already at placement size, skipping resample");
        region
    } else {
        debug!(
            x,
            y,
            width,
            height,
            target_w,
            target_h,
            "Resampling crop to placement size"
        );
        imageops::resize(&region, target_w, target_h, FilterType::Lanczos3)
    };

    Ok(RasterizedCrop {
        image: Arc::new(image),
    })
}

/// Round a native span to whole pixels inside `[0, limit)`, at least one pixel wide.
fn snap_span(start: f64, len: f64, limit: u32) -> (u32, u32) {
    let max = f64::from(limit);
    let mut lo = start.round().clamp(0.0, max);
    let hi = (start + len).round().clamp(0.0, max);
    if lo >= max {
        lo = max - 1.0;
    }
    let hi = hi.max(lo + 1.0);
    (lo as u32, (hi - lo) as u32)
}
