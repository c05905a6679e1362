//! Display-space geometry and the aspect-locked crop initializer.

use tracing::debug;

/// Tolerance for aspect-ratio comparisons.
pub const ASPECT_EPSILON: f64 = 1e-6;

/// Size at which the photo is currently rendered for the user.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplaySize {
    pub width: f64,
    pub height: f64,
}

impl DisplaySize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// True until the image has a usable on-screen size.
    pub fn is_degenerate(&self) -> bool {
        !(self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0)
    }
}

/// A pointer position in display coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Width-over-height ratio, always finite and positive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AspectRatio(f64);

impl AspectRatio {
    pub fn new(ratio: f64) -> Option<Self> {
        (ratio.is_finite() && ratio > 0.0).then_some(Self(ratio))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

/// Crop rectangle in displayed-image coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl CropRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Whether `width / height` matches `ratio` within [`ASPECT_EPSILON`].
    pub fn has_aspect(&self, ratio: AspectRatio) -> bool {
        self.height > 0.0 && (self.width / self.height - ratio.value()).abs() < ASPECT_EPSILON
    }

    /// Whether the rectangle lies entirely inside `[0, width] x [0, height]`.
    pub fn is_within(&self, bounds: DisplaySize) -> bool {
        self.x >= 0.0
            && self.y >= 0.0
            && self.right() <= bounds.width + ASPECT_EPSILON
            && self.bottom() <= bounds.height + ASPECT_EPSILON
    }
}

/// Largest centered rectangle of the given ratio inside the display bounds.
///
/// Returns `None` while the display size is degenerate (image not laid out
/// yet); callers retry once a real size is known. The result is a pure
/// function of its inputs, so auto-fit can be invoked any number of times.
pub fn initial_crop(display: DisplaySize, ratio: AspectRatio) -> Option<CropRect> {
    if display.is_degenerate() {
        let (display_width, display_height) = (display.width, display.height);
        debug!(
            width = display_width,
            height = display_height,
            "Display size not ready, deferring crop initialization"
        );
        return None;
    }

    let r = ratio.value();
    let (width, height) = if display.width / display.height > r {
        // Wider than the target: height is the binding dimension.
        ((display.height * r).min(display.width), display.height)
    } else {
        (display.width, (display.width / r).min(display.height))
    };

    Some(CropRect {
        x: (display.width - width) / 2.0,
        y: (display.height - height) / 2.0,
        width,
        height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ratio(r: f64) -> AspectRatio {
        AspectRatio::new(r).unwrap()
    }

    #[test]
    fn test_height_constrained_for_wide_display() {
        let rect = initial_crop(DisplaySize::new(800.0, 400.0), ratio(1.0)).unwrap();
        assert_eq!(rect.height, 400.0);
        assert_eq!(rect.width, 400.0);
        assert_eq!(rect.x, 200.0);
        assert_eq!(rect.y, 0.0);
    }

    #[test]
    fn test_width_constrained_for_tall_display() {
        let rect = initial_crop(DisplaySize::new(300.0, 900.0), ratio(3.0 / 4.0)).unwrap();
        assert_eq!(rect.width, 300.0);
        assert_eq!(rect.height, 400.0);
        assert_eq!(rect.x, 0.0);
        assert_eq!(rect.y, 250.0);
    }

    #[test]
    fn test_aspect_and_containment_over_grid() {
        let sizes = [1.0, 3.0, 17.5, 333.0, 640.0, 1024.0, 4000.0];
        let ratios = [0.1, 0.5, 0.75, 1.0, 4.0 / 3.0, 16.0 / 9.0, 10.0];
        for &w in &sizes {
            for &h in &sizes {
                for &r in &ratios {
                    let display = DisplaySize::new(w, h);
                    let rect = initial_crop(display, ratio(r)).unwrap();
                    assert!(rect.has_aspect(ratio(r)), "ratio {r} in {w}x{h}: {rect:?}");
                    assert!(rect.is_within(display), "{rect:?} outside {w}x{h}");
                    // Maximal: one dimension spans the display exactly.
                    assert!(rect.width == w || rect.height == h, "{rect:?} not maximal");
                }
            }
        }
    }

    #[test]
    fn test_exact_ratio_match_fills_display() {
        let rect = initial_crop(DisplaySize::new(640.0, 480.0), ratio(4.0 / 3.0)).unwrap();
        assert_eq!(rect, CropRect::new(0.0, 0.0, 640.0, 480.0));
    }

    #[test]
    fn test_auto_fit_is_idempotent() {
        let display = DisplaySize::new(1234.5, 678.9);
        let first = initial_crop(display, ratio(0.8)).unwrap();
        let second = initial_crop(display, ratio(0.8)).unwrap();
        assert_eq!(first.x.to_bits(), second.x.to_bits());
        assert_eq!(first.y.to_bits(), second.y.to_bits());
        assert_eq!(first.width.to_bits(), second.width.to_bits());
        assert_eq!(first.height.to_bits(), second.height.to_bits());
    }

    #[test]
    fn test_degenerate_display_defers() {
        assert!(initial_crop(DisplaySize::new(0.0, 400.0), ratio(1.0)).is_none());
        assert!(initial_crop(DisplaySize::new(400.0, 0.0), ratio(1.0)).is_none());
        assert!(initial_crop(DisplaySize::new(f64::NAN, 400.0), ratio(1.0)).is_none());
    }

    #[test]
    fn test_aspect_ratio_rejects_non_positive() {
        assert!(AspectRatio::new(0.0).is_none());
        assert!(AspectRatio::new(-1.0).is_none());
        assert!(AspectRatio::new(f64::INFINITY).is_none());
    }
}
