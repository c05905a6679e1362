//! Interactive, aspect-locked crop selection.
//!
//! The selector owns the rectangle the user manipulates on the displayed
//! photo. Every intermediate rectangle keeps the frame's aspect ratio and
//! stays inside the display bounds; only a released gesture (or an explicit
//! commit) yields a [`CommittedCrop`] that the rasterizer accepts.

use tracing::debug;

use crate::error::CropError;
use crate::geometry::{AspectRatio, CropRect, DisplaySize, Point, initial_crop};

/// Smallest edge, in display units, a resize may shrink the crop to.
pub const MIN_CROP_EDGE: f64 = 10.0;

/// Which part of the crop rectangle a gesture grabbed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragHandle {
    Move,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    Top,
    Bottom,
    Left,
    Right,
}

/// A crop rectangle the user finished manipulating, tied to the display
/// size it was expressed in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommittedCrop {
    rect: CropRect,
    display: DisplaySize,
}

impl CommittedCrop {
    pub fn rect(&self) -> CropRect {
        self.rect
    }

    pub fn display(&self) -> DisplaySize {
        self.display
    }
}

#[derive(Debug, Clone, Copy)]
struct Gesture {
    handle: DragHandle,
    origin: Point,
    start: CropRect,
}

/// Crop selection state for one displayed photo.
#[derive(Debug, Clone)]
pub struct CropSelector {
    ratio: AspectRatio,
    bounds: Option<DisplaySize>,
    current: Option<CropRect>,
    gesture: Option<Gesture>,
    committed: Option<CommittedCrop>,
}

impl CropSelector {
    /// Create a selector whose display size is not known yet.
    pub fn new(ratio: AspectRatio) -> Self {
        Self {
            ratio,
            bounds: None,
            current: None,
            gesture: None,
            committed: None,
        }
    }

    /// Create a selector and initialize it for `display`.
    pub fn with_display(ratio: AspectRatio, display: DisplaySize) -> Self {
        let mut selector = Self::new(ratio);
        selector.set_display_size(display);
        selector
    }

    pub fn ratio(&self) -> AspectRatio {
        self.ratio
    }

    pub fn display_size(&self) -> Option<DisplaySize> {
        self.bounds
    }

    /// The rectangle currently shown, including uncommitted gesture state.
    pub fn selection(&self) -> Option<CropRect> {
        self.current
    }

    pub fn committed(&self) -> Option<&CommittedCrop> {
        self.committed.as_ref()
    }

    pub fn is_dragging(&self) -> bool {
        self.gesture.is_some()
    }

    /// Update the display size of the photo.
    ///
    /// The first usable size initializes the selection; later changes rescale
    /// the existing selection proportionally. Any commit is dropped since its
    /// coordinates belong to the old size. A degenerate size defers everything.
    pub fn set_display_size(&mut self, display: DisplaySize) -> Option<CropRect> {
        self.gesture = None;
        self.committed = None;

        if display.is_degenerate() {
            self.bounds = None;
            self.current = None;
            return None;
        }

        let previous = self.bounds.replace(display);
        self.current = match (previous, self.current) {
            (Some(old), Some(rect)) => Some(self.rescale(rect, old, display)),
            _ => initial_crop(display, self.ratio),
        };
        self.current
    }

    /// Reset to the maximal centered rectangle, discarding manual adjustment.
    pub fn auto_fit(&mut self) -> Option<CropRect> {
        self.gesture = None;
        self.committed = None;
        self.current = self.bounds.and_then(|b| initial_crop(b, self.ratio));
        self.current
    }

    /// Replace the selection programmatically.
    ///
    /// The requested width and center are kept where possible; the height is
    /// derived from the ratio and the result is fitted inside the bounds.
    /// Non-finite coordinates are rejected and leave the selection unchanged.
    pub fn set_selection(&mut self, rect: CropRect) -> Result<CropRect, CropError> {
        let bounds = self.bounds.ok_or(CropError::NotReady)?;
        if ![rect.x, rect.y, rect.width, rect.height]
            .iter()
            .all(|v| v.is_finite())
        {
            return Err(CropError::InvalidSelection);
        }
        let r = self.ratio.value();
        let center = rect.center();
        let max_width = bounds.width.min(bounds.height * r);
        let width = clamp_width(rect.width, max_width, r);
        let height = width / r;
        let fitted = snap_inside(
            CropRect::new(center.x - width / 2.0, center.y - height / 2.0, width, height),
            bounds,
        );

        self.gesture = None;
        self.committed = None;
        self.current = Some(fitted);
        Ok(fitted)
    }

    /// Start a drag or resize gesture at `pointer`.
    pub fn begin(&mut self, handle: DragHandle, pointer: Point) -> Result<(), CropError> {
        let start = self.current.ok_or(CropError::NotReady)?;
        self.committed = None;
        self.gesture = Some(Gesture {
            handle,
            origin: pointer,
            start,
        });
        Ok(())
    }

    /// Move the active gesture to `pointer`. Returns the advisory rectangle.
    pub fn update(&mut self, pointer: Point) -> Option<CropRect> {
        let gesture = self.gesture?;
        let bounds = self.bounds?;
        if !(pointer.x.is_finite() && pointer.y.is_finite()) {
            return self.current;
        }
        let rect = self.apply(gesture, pointer, bounds);
        self.current = Some(rect);
        self.current
    }

    /// Finish the active gesture and commit its rectangle.
    pub fn release(&mut self) -> Option<CommittedCrop> {
        self.gesture.take()?;
        self.commit()
    }

    /// Abort the active gesture, restoring the rectangle it started from.
    pub fn cancel(&mut self) {
        if let Some(gesture) = self.gesture.take() {
            self.current = Some(gesture.start);
        }
    }

    /// Commit the current rectangle. Refused while a gesture is in progress.
    pub fn commit(&mut self) -> Option<CommittedCrop> {
        if self.gesture.is_some() {
            return None;
        }
        let committed = CommittedCrop {
            rect: self.current?,
            display: self.bounds?,
        };
        debug!(
            x = committed.rect.x,
            y = committed.rect.y,
            width = committed.rect.width,
            height = committed.rect.height,
            "Crop committed"
        );
        self.committed = Some(committed);
        self.committed
    }

    fn rescale(&self, rect: CropRect, old: DisplaySize, new: DisplaySize) -> CropRect {
        let r = self.ratio.value();
        let sx = new.width / old.width;
        let sy = new.height / old.height;
        let max_width = new.width.min(new.height * r);
        let width = (rect.width * sx).min(max_width);
        snap_inside(
            CropRect::new(rect.x * sx, rect.y * sy, width, width / r),
            new,
        )
    }

    fn apply(&self, gesture: Gesture, pointer: Point, bounds: DisplaySize) -> CropRect {
        let r = self.ratio.value();
        let s = gesture.start;
        let dx = pointer.x - gesture.origin.x;
        let dy = pointer.y - gesture.origin.y;

        let rect = match gesture.handle {
            DragHandle::Move => CropRect::new(s.x + dx, s.y + dy, s.width, s.height),
            DragHandle::TopLeft
            | DragHandle::TopRight
            | DragHandle::BottomLeft
            | DragHandle::BottomRight => {
                let grows_right = matches!(
                    gesture.handle,
                    DragHandle::TopRight | DragHandle::BottomRight
                );
                let grows_down = matches!(
                    gesture.handle,
                    DragHandle::BottomLeft | DragHandle::BottomRight
                );
                let anchor_x = if grows_right { s.x } else { s.right() };
                let anchor_y = if grows_down { s.y } else { s.bottom() };

                let from_x = if grows_right {
                    s.right() + dx - anchor_x
                } else {
                    anchor_x - (s.x + dx)
                };
                let from_y = if grows_down {
                    s.bottom() + dy - anchor_y
                } else {
                    anchor_y - (s.y + dy)
                } * r;
                // The dominant pointer axis drives the size.
                let wanted = if dx.abs() >= (dy * r).abs() {
                    from_x
                } else {
                    from_y
                };

                let avail_x = if grows_right {
                    bounds.width - anchor_x
                } else {
                    anchor_x
                };
                let avail_y = if grows_down {
                    bounds.height - anchor_y
                } else {
                    anchor_y
                };
                let width = clamp_width(wanted, avail_x.min(avail_y * r), r);
                let height = width / r;
                CropRect::new(
                    if grows_right { anchor_x } else { anchor_x - width },
                    if grows_down { anchor_y } else { anchor_y - height },
                    width,
                    height,
                )
            }
            DragHandle::Left | DragHandle::Right => {
                let grows_right = gesture.handle == DragHandle::Right;
                let anchor_x = if grows_right { s.x } else { s.right() };
                let wanted = if grows_right {
                    s.right() + dx - anchor_x
                } else {
                    anchor_x - (s.x + dx)
                };
                let cy = s.y + s.height / 2.0;
                let avail_x = if grows_right {
                    bounds.width - anchor_x
                } else {
                    anchor_x
                };
                let max_height = 2.0 * cy.min(bounds.height - cy);
                let width = clamp_width(wanted, avail_x.min(max_height * r), r);
                let height = width / r;
                CropRect::new(
                    if grows_right { anchor_x } else { anchor_x - width },
                    cy - height / 2.0,
                    width,
                    height,
                )
            }
            DragHandle::Top | DragHandle::Bottom => {
                let grows_down = gesture.handle == DragHandle::Bottom;
                let anchor_y = if grows_down { s.y } else { s.bottom() };
                let wanted_height = if grows_down {
                    s.bottom() + dy - anchor_y
                } else {
                    anchor_y - (s.y + dy)
                };
                let cx = s.x + s.width / 2.0;
                let avail_y = if grows_down {
                    bounds.height - anchor_y
                } else {
                    anchor_y
                };
                let max_width = (2.0 * cx.min(bounds.width - cx)).min(avail_y * r);
                let width = clamp_width(wanted_height * r, max_width, r);
                let height = width / r;
                CropRect::new(
                    cx - width / 2.0,
                    if grows_down { anchor_y } else { anchor_y - height },
                    width,
                    height,
                )
            }
        };

        snap_inside(rect, bounds)
    }
}

/// Clamp a requested width so both edges respect the minimum and `max_width`.
fn clamp_width(wanted: f64, max_width: f64, ratio: f64) -> f64 {
    let max_width = max_width.max(0.0);
    let min_width = MIN_CROP_EDGE.max(MIN_CROP_EDGE * ratio).min(max_width);
    if wanted.is_nan() {
        return min_width;
    }
    wanted.clamp(min_width, max_width)
}

/// Translate `rect` so it lies inside `bounds` without changing its size.
fn snap_inside(rect: CropRect, bounds: DisplaySize) -> CropRect {
    CropRect {
        x: rect.x.clamp(0.0, (bounds.width - rect.width).max(0.0)),
        y: rect.y.clamp(0.0, (bounds.height - rect.height).max(0.0)),
        ..rect
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_HANDLES: [DragHandle; 9] = [
        DragHandle::Move,
        DragHandle::TopLeft,
        DragHandle::TopRight,
        DragHandle::BottomLeft,
        DragHandle::BottomRight,
        DragHandle::Top,
        DragHandle::Bottom,
        DragHandle::Left,
        DragHandle::Right,
    ];

    fn selector(ratio: f64, w: f64, h: f64) -> CropSelector {
        CropSelector::with_display(AspectRatio::new(ratio).unwrap(), DisplaySize::new(w, h))
    }

    fn handle_point(rect: CropRect, handle: DragHandle) -> Point {
        let c = rect.center();
        match handle {
            DragHandle::Move => c,
            DragHandle::TopLeft => Point::new(rect.x, rect.y),
            DragHandle::TopRight => Point::new(rect.right(), rect.y),
            DragHandle::BottomLeft => Point::new(rect.x, rect.bottom()),
            DragHandle::BottomRight => Point::new(rect.right(), rect.bottom()),
            DragHandle::Top => Point::new(c.x, rect.y),
            DragHandle::Bottom => Point::new(c.x, rect.bottom()),
            DragHandle::Left => Point::new(rect.x, c.y),
            DragHandle::Right => Point::new(rect.right(), c.y),
        }
    }

    #[test]
    fn test_initializes_to_auto_fit() {
        let sel = selector(1.0, 800.0, 600.0);
        assert_eq!(
            sel.selection(),
            Some(CropRect::new(100.0, 0.0, 600.0, 600.0))
        );
        assert!(sel.committed().is_none());
    }

    #[test]
    fn test_deferred_until_display_known() {
        let mut sel = CropSelector::new(AspectRatio::new(2.0).unwrap());
        assert!(sel.selection().is_none());
        assert_eq!(
            sel.begin(DragHandle::Move, Point::new(0.0, 0.0)),
            Err(CropError::NotReady)
        );
        assert!(sel.set_display_size(DisplaySize::new(0.0, 0.0)).is_none());
        let rect = sel.set_display_size(DisplaySize::new(400.0, 400.0)).unwrap();
        assert_eq!(rect, CropRect::new(0.0, 100.0, 400.0, 200.0));
    }

    #[test]
    fn test_move_is_clamped_to_bounds() {
        let mut sel = selector(1.0, 800.0, 600.0);
        sel.set_selection(CropRect::new(100.0, 100.0, 200.0, 200.0))
            .unwrap();
        sel.begin(DragHandle::Move, Point::new(200.0, 200.0)).unwrap();
        let rect = sel.update(Point::new(5000.0, -5000.0)).unwrap();
        assert_eq!(rect, CropRect::new(600.0, 0.0, 200.0, 200.0));
    }

    #[test]
    fn test_every_handle_keeps_aspect_and_bounds() {
        let display = DisplaySize::new(640.0, 480.0);
        let ratio = AspectRatio::new(4.0 / 5.0).unwrap();
        let pointers = [
            (-1000.0, -1000.0),
            (-30.0, 12.0),
            (0.0, 0.0),
            (25.0, 25.0),
            (80.0, -60.0),
            (3000.0, 3000.0),
            (320.0, 2.5),
        ];
        for handle in ALL_HANDLES {
            for &(px, py) in &pointers {
                let mut sel = CropSelector::with_display(ratio, display);
                sel.set_selection(CropRect::new(200.0, 100.0, 160.0, 200.0))
                    .unwrap();
                let start = handle_point(sel.selection().unwrap(), handle);
                sel.begin(handle, start).unwrap();
                for step in 1..=4 {
                    let t = f64::from(step) / 4.0;
                    let p = Point::new(start.x + px * t, start.y + py * t);
                    let rect = sel.update(p).unwrap();
                    assert!(rect.has_aspect(ratio), "{handle:?} {p:?} -> {rect:?}");
                    assert!(rect.is_within(display), "{handle:?} {p:?} -> {rect:?}");
                    assert!(rect.width > 0.0 && rect.height > 0.0);
                }
            }
        }
    }

    #[test]
    fn test_corner_resize_anchors_opposite_corner() {
        let mut sel = selector(1.0, 1000.0, 1000.0);
        sel.set_selection(CropRect::new(100.0, 100.0, 400.0, 400.0))
            .unwrap();
        sel.begin(DragHandle::BottomRight, Point::new(500.0, 500.0))
            .unwrap();
        let rect = sel.update(Point::new(600.0, 550.0)).unwrap();
        assert_eq!(rect, CropRect::new(100.0, 100.0, 500.0, 500.0));

        sel.release();
        sel.begin(DragHandle::TopLeft, Point::new(100.0, 100.0)).unwrap();
        let rect = sel.update(Point::new(300.0, 300.0)).unwrap();
        assert_eq!(rect, CropRect::new(300.0, 300.0, 300.0, 300.0));
    }

    #[test]
    fn test_resize_respects_minimum_edge() {
        let mut sel = selector(2.0, 1000.0, 1000.0);
        sel.set_selection(CropRect::new(100.0, 100.0, 200.0, 100.0))
            .unwrap();
        sel.begin(DragHandle::BottomRight, Point::new(300.0, 200.0))
            .unwrap();
        let rect = sel.update(Point::new(-500.0, 200.0)).unwrap();
        assert_eq!(rect.width, MIN_CROP_EDGE * 2.0);
        assert_eq!(rect.height, MIN_CROP_EDGE);
    }

    #[test]
    fn test_only_release_commits() {
        let mut sel = selector(1.0, 500.0, 500.0);
        sel.begin(DragHandle::Move, Point::new(250.0, 250.0)).unwrap();
        sel.update(Point::new(260.0, 250.0));
        assert!(sel.committed().is_none());
        assert!(sel.commit().is_none(), "commit refused mid-gesture");

        let committed = sel.release().unwrap();
        assert_eq!(committed.rect(), sel.selection().unwrap());
        assert_eq!(committed.display(), DisplaySize::new(500.0, 500.0));

        sel.begin(DragHandle::Move, Point::new(0.0, 0.0)).unwrap();
        assert!(sel.committed().is_none(), "new gesture supersedes commit");
    }

    #[test]
    fn test_cancel_restores_start() {
        let mut sel = selector(1.0, 500.0, 300.0);
        let before = sel.selection().unwrap();
        sel.begin(DragHandle::Left, Point::new(before.x, 150.0))
            .unwrap();
        sel.update(Point::new(before.x + 50.0, 150.0));
        sel.cancel();
        assert_eq!(sel.selection(), Some(before));
        assert!(!sel.is_dragging());
    }

    #[test]
    fn test_auto_fit_discards_manual_adjustment() {
        let mut sel = selector(1.0, 800.0, 600.0);
        let initial = sel.selection().unwrap();
        sel.set_selection(CropRect::new(0.0, 0.0, 50.0, 50.0)).unwrap();
        sel.commit();
        assert_eq!(sel.auto_fit(), Some(initial));
        assert!(sel.committed().is_none());
    }

    #[test]
    fn test_set_selection_enforces_ratio() {
        let mut sel = selector(0.5, 1000.0, 1000.0);
        let rect = sel
            .set_selection(CropRect::new(400.0, 400.0, 200.0, 100.0))
            .unwrap();
        assert_eq!(rect.width, 200.0);
        assert_eq!(rect.height, 400.0);
        assert_eq!(rect.center(), Point::new(500.0, 450.0));
    }

    #[test]
    fn test_set_selection_rejects_non_finite() {
        let mut sel = selector(1.0, 100.0, 100.0);
        let before = sel.selection();
        for rect in [
            CropRect::new(f64::NAN, 10.0, 50.0, 50.0),
            CropRect::new(0.0, f64::NAN, 50.0, 50.0),
            CropRect::new(0.0, 0.0, f64::INFINITY, 50.0),
            CropRect::new(f64::NEG_INFINITY, 0.0, 50.0, 50.0),
        ] {
            assert_eq!(sel.set_selection(rect), Err(CropError::InvalidSelection));
        }
        assert_eq!(sel.selection(), before);
        let committed = sel.commit().unwrap();
        assert!(committed.rect().is_within(DisplaySize::new(100.0, 100.0)));
    }

    #[test]
    fn test_display_resize_rescales_selection() {
        let mut sel = selector(1.0, 1000.0, 500.0);
        sel.set_selection(CropRect::new(100.0, 100.0, 200.0, 200.0))
            .unwrap();
        sel.commit();
        let rect = sel
            .set_display_size(DisplaySize::new(500.0, 250.0))
            .unwrap();
        assert_eq!(rect, CropRect::new(50.0, 50.0, 100.0, 100.0));
        assert!(sel.committed().is_none());
    }
}
