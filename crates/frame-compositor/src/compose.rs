//! Final composite: photo crop beneath the frame template, caption on top.
//!
//! Both image layers are loaded concurrently and drawing starts only after
//! both are available. A failure of either load aborts the attempt before a
//! single pixel is drawn.

use std::future::Future;
use std::sync::Arc;

use image::{DynamicImage, RgbaImage};
use tracing::{debug, info, warn};

use crate::canvas::{Canvas, check_pixel_ratio};
use crate::encode::CompositeOutput;
use crate::error::{ComposeError, LoadError};
use crate::frame::FrameTemplate;
use crate::text::{self, FontBook, PreparedCaption};

/// Resolves an external image reference (URL, path, ...) into pixels.
pub trait ImageLoader {
    fn load(&self, reference: &str) -> impl Future<Output = Result<DynamicImage, LoadError>> + Send;
}

/// Where a compositor layer comes from.
#[derive(Debug, Clone)]
pub enum LayerSource {
    /// Pixels already in memory.
    Decoded(Arc<RgbaImage>),
    /// Encoded image bytes, decoded on load.
    Encoded(Arc<[u8]>),
    /// A reference resolved by the [`ImageLoader`].
    Reference(String),
}

impl LayerSource {
    pub fn reference(reference: impl Into<String>) -> Self {
        Self::Reference(reference.into())
    }

    pub fn encoded(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self::Encoded(bytes.into())
    }

    async fn load<L: ImageLoader>(&self, loader: &L) -> Result<Arc<RgbaImage>, LoadError> {
        match self {
            Self::Decoded(image) => Ok(Arc::clone(image)),
            Self::Encoded(bytes) => Ok(Arc::new(image::load_from_memory(bytes)?.to_rgba8())),
            Self::Reference(reference) => {
                let image = loader.load(reference).await?;
                Ok(Arc::new(image.to_rgba8()))
            }
        }
    }
}

/// Everything one composite attempt needs.
#[derive(Debug, Clone)]
pub struct CompositeRequest {
    pub frame: Arc<FrameTemplate>,
    pub photo: LayerSource,
    pub template: LayerSource,
    pub caption: Option<String>,
    pub pixel_ratio: f32,
}

/// Layers photo, template and caption onto a pixel-ratio scaled canvas.
#[derive(Debug, Clone, Default)]
pub struct Compositor {
    fonts: Arc<FontBook>,
}

impl Compositor {
    pub fn new(fonts: Arc<FontBook>) -> Self {
        Self { fonts }
    }

    pub fn fonts(&self) -> &FontBook {
        &self.fonts
    }

    /// Load both layers concurrently, then draw.
    ///
    /// Validation, caption font and color resolution happen before any load
    /// starts; either load failing yields a layer-specific error and no output.
    pub async fn compose<L: ImageLoader>(
        &self,
        request: &CompositeRequest,
        loader: &L,
    ) -> Result<CompositeOutput, ComposeError> {
        let frame = &request.frame;
        frame.validate()?;
        check_pixel_ratio(request.pixel_ratio)?;
        let caption = text::prepare_caption(
            &self.fonts,
            frame.text_style.as_ref(),
            request.caption.as_deref(),
        )?;

        let photo = async {
            request
                .photo
                .load(loader)
                .await
                .map_err(ComposeError::PhotoLoad)
        };
        let template = async {
            request
                .template
                .load(loader)
                .await
                .map_err(ComposeError::TemplateLoad)
        };
        let (photo, template) = match tokio::try_join!(photo, template) {
            Ok(layers) => layers,
            Err(e) => {
                warn!(frame_id = %frame.id, error = %e, "Composite aborted, layer failed to load");
                return Err(e);
            }
        };

        let output = self.draw(frame, &photo, &template, caption.as_ref(), request.pixel_ratio)?;
        info!(
            frame_id = %frame.id,
            width = output.width(),
            height = output.height(),
            pixel_ratio = request.pixel_ratio,
            "Composite produced"
        );
        Ok(output)
    }

    /// Draw already-loaded layers. `caption` is skipped when empty.
    pub fn compose_loaded(
        &self,
        frame: &FrameTemplate,
        photo: &RgbaImage,
        template: &RgbaImage,
        caption: Option<&str>,
        pixel_ratio: f32,
    ) -> Result<CompositeOutput, ComposeError> {
        frame.validate()?;
        check_pixel_ratio(pixel_ratio)?;
        let caption = text::prepare_caption(&self.fonts, frame.text_style.as_ref(), caption)?;
        self.draw(frame, photo, template, caption.as_ref(), pixel_ratio)
    }

    fn draw(
        &self,
        frame: &FrameTemplate,
        photo: &RgbaImage,
        template: &RgbaImage,
        caption: Option<&PreparedCaption>,
        pixel_ratio: f32,
    ) -> Result<CompositeOutput, ComposeError> {
        let dims = frame.dimensions;
        let placement = frame.placement_rect;

        if photo.dimensions() != (placement.width, placement.height) {
            debug!(
                photo_w = photo.width(),
                photo_h = photo.height(),
                placement_w = placement.width,
                placement_h = placement.height,
                "Photo layer differs from placement size, it will be stretched"
            );
        }
        if template.dimensions() != (dims.width, dims.height) {
            warn!(
                frame_id = %frame.id,
                template_w = template.width(),
                template_h = template.height(),
                width = dims.width,
                height = dims.height,
                "Template image size differs from frame dimensions"
            );
        }

        let mut canvas = Canvas::new(dims, pixel_ratio)?;
        canvas.clear();

        // Layer order is significant: photo, then template, then caption.
        canvas.draw_image(
            photo,
            f64::from(placement.x),
            f64::from(placement.y),
            f64::from(placement.width),
            f64::from(placement.height),
        );
        canvas.draw_image(
            template,
            0.0,
            0.0,
            f64::from(dims.width),
            f64::from(dims.height),
        );
        if let Some(caption) = caption {
            text::draw_caption(&mut canvas, caption);
        }

        Ok(canvas.into_output())
    }
}
