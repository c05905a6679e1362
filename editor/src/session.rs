//! Editor session: the step-by-step flow from frame choice to delivery.
//!
//! Stages advance `SelectFrame -> UploadPhoto -> Crop -> Preview -> Complete`.
//! Going back discards everything computed after the stage returned to.
//!
//! Preview composites run outside the session. Every input change bumps a
//! generation counter; a [`PreviewOutcome`] is applied only when it carries the
//! current generation and session id, so a slow composite that finishes after
//! the user moved on can never overwrite newer state.

use std::fmt;
use std::sync::Arc;

use frame_compositor::{
    AspectRatio, CommittedCrop, ComposeError, CompositeOutput, CompositeRequest, Compositor,
    CropError, CropRect, CropSelector, DisplaySize, DragHandle, FrameError, FrameTemplate,
    ImageLoader, LayerSource, Point, RasterizedCrop, SourceImage, rasterize_crop,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::tracking::{UsageTracker, track_best_effort};
use crate::upload::{PhotoUpload, UploadError, validate_upload};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EditorStage {
    SelectFrame,
    UploadPhoto,
    Crop,
    Preview,
    Complete,
}

impl EditorStage {
    pub fn previous(self) -> Option<Self> {
        match self {
            Self::SelectFrame => None,
            Self::UploadPhoto => Some(Self::SelectFrame),
            Self::Crop => Some(Self::UploadPhoto),
            Self::Preview => Some(Self::Crop),
            Self::Complete => Some(Self::Preview),
        }
    }
}

impl fmt::Display for EditorStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SelectFrame => "select-frame",
            Self::UploadPhoto => "upload-photo",
            Self::Crop => "crop",
            Self::Preview => "preview",
            Self::Complete => "complete",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error("Not allowed in stage {actual} (expected {expected})")]
    WrongStage {
        expected: EditorStage,
        actual: EditorStage,
    },

    #[error("Already at the first stage")]
    NoPreviousStage,

    #[error("Invalid frame: {0}")]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error("Crop failed: {0}")]
    Crop(#[from] CropError),

    #[error("Confirm the crop selection first")]
    CropNotCommitted,

    #[error("Preview failed: {0}")]
    Compose(#[from] ComposeError),

    #[error("No up-to-date preview yet")]
    PreviewNotReady,
}

/// Per-session limits and defaults.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionOptions {
    pub max_upload_bytes: u64,
    pub pixel_ratio: f32,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            max_upload_bytes: 10 * 1024 * 1024,
            pixel_ratio: 1.0,
        }
    }
}

/// A snapshot of the preview inputs, ready to be composited off the session.
#[derive(Debug, Clone)]
pub struct PreviewRequest {
    session: Uuid,
    generation: u64,
    request: CompositeRequest,
}

impl PreviewRequest {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn composite_request(&self) -> &CompositeRequest {
        &self.request
    }

    pub async fn run<L: ImageLoader>(self, compositor: &Compositor, loader: &L) -> PreviewOutcome {
        let result = compositor.compose(&self.request, loader).await;
        PreviewOutcome {
            session: self.session,
            generation: self.generation,
            result,
        }
    }
}

/// The result of a [`PreviewRequest`], to be handed back to the session.
#[derive(Debug)]
pub struct PreviewOutcome {
    session: Uuid,
    generation: u64,
    result: Result<CompositeOutput, ComposeError>,
}

impl PreviewOutcome {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// What [`EditorSession::apply_preview`] did with an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewApplied {
    Installed,
    Stale,
}

#[derive(Debug, Clone)]
struct PreviewSlot {
    output: Arc<CompositeOutput>,
    generation: u64,
}

/// State of one editing flow.
#[derive(Debug)]
pub struct EditorSession {
    id: Uuid,
    stage: EditorStage,
    options: SessionOptions,
    frame: Option<Arc<FrameTemplate>>,
    template: Option<LayerSource>,
    source: Option<SourceImage>,
    selector: Option<CropSelector>,
    crop: Option<RasterizedCrop>,
    caption: String,
    generation: u64,
    preview: Option<PreviewSlot>,
    delivered: bool,
}

impl EditorSession {
    pub fn new(options: SessionOptions) -> Self {
        let id = Uuid::new_v4();
        debug!(session = %id, "Editor session started");
        Self {
            id,
            stage: EditorStage::SelectFrame,
            options,
            frame: None,
            template: None,
            source: None,
            selector: None,
            crop: None,
            caption: String::new(),
            generation: 0,
            preview: None,
            delivered: false,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn stage(&self) -> EditorStage {
        self.stage
    }

    pub fn options(&self) -> SessionOptions {
        self.options
    }

    pub fn frame(&self) -> Option<&FrameTemplate> {
        self.frame.as_deref()
    }

    pub fn caption(&self) -> &str {
        &self.caption
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Native pixel size of the uploaded photo.
    pub fn natural_size(&self) -> Option<(u32, u32)> {
        self.source.as_ref().map(SourceImage::natural_size)
    }

    pub fn display_size(&self) -> Option<DisplaySize> {
        self.source.as_ref().map(SourceImage::display_size)
    }

    /// The rectangle currently shown on the photo, if any.
    pub fn selection(&self) -> Option<CropRect> {
        self.selector.as_ref().and_then(CropSelector::selection)
    }

    pub fn committed_crop(&self) -> Option<CommittedCrop> {
        self.selector.as_ref().and_then(|s| s.committed().copied())
    }

    pub fn rasterized_crop(&self) -> Option<&RasterizedCrop> {
        self.crop.as_ref()
    }

    /// Most recent successful preview, possibly older than the current inputs.
    pub fn preview(&self) -> Option<&CompositeOutput> {
        self.preview.as_ref().map(|slot| slot.output.as_ref())
    }

    /// Whether the shown preview reflects the current inputs.
    pub fn is_preview_current(&self) -> bool {
        self.preview
            .as_ref()
            .is_some_and(|slot| slot.generation == self.generation)
    }

    /// The delivered composite, once complete.
    pub fn output(&self) -> Option<Arc<CompositeOutput>> {
        match self.stage {
            EditorStage::Complete => self.preview.as_ref().map(|slot| Arc::clone(&slot.output)),
            _ => None,
        }
    }

    fn expect_stage(&self, expected: EditorStage) -> Result<(), EditorError> {
        if self.stage == expected {
            Ok(())
        } else {
            Err(EditorError::WrongStage {
                expected,
                actual: self.stage,
            })
        }
    }

    fn advance(&mut self, stage: EditorStage) {
        info!(session = %self.id, from = %self.stage, to = %stage, "Editor stage changed");
        self.stage = stage;
    }

    fn invalidate_preview(&mut self) {
        self.generation += 1;
    }

    fn ratio(&self) -> Result<AspectRatio, EditorError> {
        let frame = self.frame.as_ref().ok_or(EditorError::WrongStage {
            expected: EditorStage::UploadPhoto,
            actual: self.stage,
        })?;
        let p = frame.placement_rect;
        frame.aspect_ratio().ok_or(EditorError::Frame(FrameError::EmptyPlacement {
            width: p.width,
            height: p.height,
        }))
    }

    /// Choose a frame whose template image is fetched from its own URL.
    pub fn select_frame(&mut self, frame: FrameTemplate) -> Result<(), EditorError> {
        let template = LayerSource::reference(frame.template_image_url.clone());
        self.select_frame_with_template(frame, template)
    }

    /// Choose a frame, supplying where its template image comes from.
    pub fn select_frame_with_template(
        &mut self,
        frame: FrameTemplate,
        template: LayerSource,
    ) -> Result<(), EditorError> {
        self.expect_stage(EditorStage::SelectFrame)?;
        frame.validate()?;
        info!(session = %self.id, frame_id = %frame.id, "Frame selected");
        self.frame = Some(Arc::new(frame));
        self.template = Some(template);
        self.advance(EditorStage::UploadPhoto);
        Ok(())
    }

    /// Validate and decode the photo, then open the crop step.
    ///
    /// The selection is initialized once `display` is usable; a degenerate
    /// size defers it until [`set_display_size`](Self::set_display_size).
    pub fn upload_photo(
        &mut self,
        upload: &PhotoUpload,
        display: DisplaySize,
    ) -> Result<Option<CropRect>, EditorError> {
        self.expect_stage(EditorStage::UploadPhoto)?;
        let ratio = self.ratio()?;
        let photo = validate_upload(upload, self.options.max_upload_bytes)?;

        let source = SourceImage::new(photo.image, display);
        let (width, height) = source.natural_size();
        info!(session = %self.id, width, height, "Photo uploaded");

        let selector = CropSelector::with_display(ratio, display);
        let selection = selector.selection();
        self.source = Some(source);
        self.selector = Some(selector);
        self.advance(EditorStage::Crop);
        Ok(selection)
    }

    /// The photo is now shown at a different size.
    pub fn set_display_size(&mut self, display: DisplaySize) -> Result<Option<CropRect>, EditorError> {
        self.expect_stage(EditorStage::Crop)?;
        let (Some(source), Some(selector)) = (self.source.as_mut(), self.selector.as_mut()) else {
            return Err(EditorError::Crop(CropError::NotReady));
        };
        source.set_display_size(display);
        Ok(selector.set_display_size(display))
    }

    fn selector_mut(&mut self) -> Result<&mut CropSelector, EditorError> {
        self.expect_stage(EditorStage::Crop)?;
        self.selector
            .as_mut()
            .ok_or(EditorError::Crop(CropError::NotReady))
    }

    pub fn begin_drag(&mut self, handle: DragHandle, pointer: Point) -> Result<(), EditorError> {
        Ok(self.selector_mut()?.begin(handle, pointer)?)
    }

    pub fn update_drag(&mut self, pointer: Point) -> Result<Option<CropRect>, EditorError> {
        Ok(self.selector_mut()?.update(pointer))
    }

    /// Finish the gesture; the released rectangle becomes the committed crop.
    pub fn release_drag(&mut self) -> Result<Option<CommittedCrop>, EditorError> {
        Ok(self.selector_mut()?.release())
    }

    pub fn cancel_drag(&mut self) -> Result<(), EditorError> {
        self.selector_mut()?.cancel();
        Ok(())
    }

    /// Reset the selection to the largest centered rectangle.
    pub fn auto_fit(&mut self) -> Result<Option<CropRect>, EditorError> {
        Ok(self.selector_mut()?.auto_fit())
    }

    pub fn set_selection(&mut self, rect: CropRect) -> Result<CropRect, EditorError> {
        Ok(self.selector_mut()?.set_selection(rect)?)
    }

    /// Commit the current selection without a gesture.
    pub fn commit_crop(&mut self) -> Result<CommittedCrop, EditorError> {
        self.selector_mut()?
            .commit()
            .ok_or(EditorError::CropNotCommitted)
    }

    /// Rasterize the committed crop and open the preview step.
    pub fn confirm_crop(&mut self) -> Result<&RasterizedCrop, EditorError> {
        self.expect_stage(EditorStage::Crop)?;
        let committed = self.committed_crop().ok_or(EditorError::CropNotCommitted)?;
        let (Some(frame), Some(source)) = (self.frame.as_ref(), self.source.as_ref()) else {
            return Err(EditorError::Crop(CropError::NotReady));
        };
        let target = (frame.placement_rect.width, frame.placement_rect.height);
        let crop = rasterize_crop(source, &committed, target)?;

        self.invalidate_preview();
        self.preview = None;
        self.advance(EditorStage::Preview);
        Ok(self.crop.insert(crop))
    }

    /// Change the caption. Any preview made with the old text becomes stale.
    pub fn set_caption(&mut self, caption: impl Into<String>) -> Result<(), EditorError> {
        if self.stage == EditorStage::Complete {
            return Err(EditorError::WrongStage {
                expected: EditorStage::Preview,
                actual: self.stage,
            });
        }
        let caption = caption.into();
        if caption != self.caption {
            self.caption = caption;
            self.invalidate_preview();
        }
        Ok(())
    }

    /// Change the device pixel ratio used for previews.
    pub fn set_pixel_ratio(&mut self, pixel_ratio: f32) {
        if pixel_ratio != self.options.pixel_ratio {
            self.options.pixel_ratio = pixel_ratio;
            self.invalidate_preview();
        }
    }

    /// Snapshot the current inputs for a composite.
    ///
    /// Issuing a request supersedes every earlier one.
    pub fn preview_request(&mut self) -> Result<PreviewRequest, EditorError> {
        self.expect_stage(EditorStage::Preview)?;
        let (Some(frame), Some(template), Some(crop)) =
            (self.frame.as_ref(), self.template.as_ref(), self.crop.as_ref())
        else {
            return Err(EditorError::CropNotCommitted);
        };

        let request = CompositeRequest {
            frame: Arc::clone(frame),
            photo: LayerSource::Decoded(crop.shared()),
            template: template.clone(),
            caption: Some(self.caption.clone()).filter(|c| !c.trim().is_empty()),
            pixel_ratio: self.options.pixel_ratio,
        };
        self.invalidate_preview();
        debug!(session = %self.id, generation = self.generation, "Preview requested");
        Ok(PreviewRequest {
            session: self.id,
            generation: self.generation,
            request,
        })
    }

    /// Install a finished preview if it still matches the session state.
    ///
    /// Stale outcomes are dropped. A failed composite leaves the previous
    /// preview in place and reports the error.
    pub fn apply_preview(&mut self, outcome: PreviewOutcome) -> Result<PreviewApplied, EditorError> {
        if outcome.session != self.id
            || outcome.generation != self.generation
            || self.stage != EditorStage::Preview
        {
            debug!(
                session = %self.id,
                generation = outcome.generation,
                current = self.generation,
                stage = %self.stage,
                "Dropping stale preview"
            );
            return Ok(PreviewApplied::Stale);
        }

        match outcome.result {
            Ok(output) => {
                info!(
                    session = %self.id,
                    generation = outcome.generation,
                    width = output.width(),
                    height = output.height(),
                    "Preview updated"
                );
                self.preview = Some(PreviewSlot {
                    output: Arc::new(output),
                    generation: outcome.generation,
                });
                Ok(PreviewApplied::Installed)
            }
            Err(e) => {
                warn!(session = %self.id, error = %e, "Preview composite failed");
                Err(EditorError::Compose(e))
            }
        }
    }

    /// Request, composite and apply a preview in one call.
    pub async fn refresh_preview<L: ImageLoader>(
        &mut self,
        compositor: &Compositor,
        loader: &L,
    ) -> Result<&CompositeOutput, EditorError> {
        let request = self.preview_request()?;
        let outcome = request.run(compositor, loader).await;
        match self.apply_preview(outcome)? {
            PreviewApplied::Installed => self.preview().ok_or(EditorError::PreviewNotReady),
            PreviewApplied::Stale => Err(EditorError::PreviewNotReady),
        }
    }

    /// Return to the previous stage, discarding what was computed after it.
    pub fn back(&mut self) -> Result<EditorStage, EditorError> {
        let previous = self.stage.previous().ok_or(EditorError::NoPreviousStage)?;
        match self.stage {
            EditorStage::UploadPhoto => {
                self.frame = None;
                self.template = None;
            }
            EditorStage::Crop => {
                self.source = None;
                self.selector = None;
            }
            EditorStage::Preview => {
                self.crop = None;
                self.preview = None;
                self.invalidate_preview();
                let ratio = self.ratio()?;
                let display = self.display_size();
                self.selector = Some(match display {
                    Some(display) => CropSelector::with_display(ratio, display),
                    None => CropSelector::new(ratio),
                });
            }
            EditorStage::Complete => {
                self.delivered = false;
            }
            EditorStage::SelectFrame => {}
        }
        self.advance(previous);
        Ok(previous)
    }

    /// Finish with the current preview as the final composite.
    pub fn complete(&mut self) -> Result<Arc<CompositeOutput>, EditorError> {
        self.expect_stage(EditorStage::Preview)?;
        if !self.is_preview_current() {
            return Err(EditorError::PreviewNotReady);
        }
        let output = self
            .preview
            .as_ref()
            .map(|slot| Arc::clone(&slot.output))
            .ok_or(EditorError::PreviewNotReady)?;
        self.advance(EditorStage::Complete);
        Ok(output)
    }

    /// Report the delivered composite's frame to `tracker`, at most once.
    ///
    /// Tracking failures are logged and never fail the delivery.
    pub async fn deliver<T: UsageTracker>(&mut self, tracker: &T) -> Result<(), EditorError> {
        self.expect_stage(EditorStage::Complete)?;
        if self.delivered {
            return Ok(());
        }
        self.delivered = true;
        if let Some(frame) = self.frame.as_ref() {
            track_best_effort(tracker, &frame.id).await;
        }
        Ok(())
    }

    /// Start over with a fresh session id.
    pub fn reset(&mut self) {
        info!(session = %self.id, "Editor session reset");
        *self = Self::new(self.options);
    }
}

impl Default for EditorSession {
    fn default() -> Self {
        Self::new(SessionOptions::default())
    }
}
