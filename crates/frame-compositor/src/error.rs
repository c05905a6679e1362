//! Error types for the compositing pipeline.

/// A frame template record that violates its geometric invariants.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FrameError {
    #[error("Frame id must not be empty")]
    MissingId,

    #[error("Output dimensions must be non-zero, got {width}x{height}")]
    EmptyDimensions { width: u32, height: u32 },

    #[error("Placement rectangle must be non-zero, got {width}x{height}")]
    EmptyPlacement { width: u32, height: u32 },

    #[error(
        "Placement rectangle ({x}, {y}, {width}x{height}) exceeds output {canvas_width}x{canvas_height}"
    )]
    PlacementOutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        canvas_width: u32,
        canvas_height: u32,
    },

    #[error("Invalid text style: {0}")]
    InvalidTextStyle(String),
}

/// Crop selection and rasterization failures.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CropError {
    #[error("Crop selector has no display size yet")]
    NotReady,

    #[error("Committed crop was made against display {committed_width}x{committed_height}, image is displayed at {display_width}x{display_height}")]
    StaleSelection {
        committed_width: f64,
        committed_height: f64,
        display_width: f64,
        display_height: f64,
    },

    #[error("Crop target must be non-zero, got {width}x{height}")]
    EmptyTarget { width: u32, height: u32 },

    #[error("Source image is empty")]
    EmptySource,

    #[error("Crop selection must have finite coordinates")]
    InvalidSelection,
}

/// An image layer that could not be brought into a drawable form.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Image decode failed: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Image not found: {0}")]
    NotFound(String),

    #[error("Failed to read {reference}: {source}")]
    Io {
        reference: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Request for {reference} failed: {message}")]
    Http { reference: String, message: String },

    #[error("Request for {reference} was rejected with status {status}")]
    Status { reference: String, status: u16 },

    #[error("Unsupported image reference: {0}")]
    InvalidReference(String),
}

/// Failures of a composite attempt. Nothing is drawn when any of these occur.
#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error("Pixel ratio must be greater than 0 and at most 8, got {0}")]
    InvalidPixelRatio(f32),

    #[error("Photo layer failed to load: {0}")]
    PhotoLoad(#[source] LoadError),

    #[error("Template layer failed to load: {0}")]
    TemplateLoad(#[source] LoadError),

    #[error("No font available for caption family '{0}'")]
    FontUnavailable(String),

    #[error("Invalid caption color '{0}'")]
    InvalidColor(String),

    #[error("Output encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}
