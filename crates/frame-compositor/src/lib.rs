//! Photo frame compositing pipeline.
//!
//! Maps a user-cropped photo onto the placement rectangle of a frame
//! template and layers photo, template overlay and optional caption into a
//! single raster at the requested device pixel ratio.

pub mod canvas;
pub mod compose;
pub mod crop;
pub mod encode;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod rasterize;
pub mod text;

// Re-exports for convenience
pub use canvas::Canvas;
pub use compose::{CompositeRequest, Compositor, ImageLoader, LayerSource};
pub use crop::{CommittedCrop, CropSelector, DragHandle};
pub use encode::CompositeOutput;
pub use error::{ComposeError, CropError, FrameError, LoadError};
pub use frame::{Dimensions, FrameTemplate, PlacementRect, TextStyle};
pub use geometry::{AspectRatio, CropRect, DisplaySize, Point, initial_crop};
pub use rasterize::{NativeRect, RasterizedCrop, SourceImage, rasterize_crop, to_native};
pub use text::FontBook;

/// Result type alias for compositing operations.
pub type Result<T> = std::result::Result<T, ComposeError>;
