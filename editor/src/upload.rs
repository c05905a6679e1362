//! Photo upload validation.
//!
//! Runs before anything is decoded into the editor, so a bad upload is
//! reported with a message the user can act on instead of surfacing later
//! as a compositing failure.

use std::path::Path;

use image::{DynamicImage, ImageFormat};

/// A photo as received from the user.
#[derive(Debug, Clone, Default)]
pub struct PhotoUpload {
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl PhotoUpload {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            ..Self::default()
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Read an upload from disk, guessing its content type from the name.
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let mut upload = Self::new(bytes);
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            upload.filename = Some(name.to_string());
        }
        upload.content_type = mime_guess::from_path(path)
            .first()
            .map(|m| m.essence_str().to_string());
        Ok(upload)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("The uploaded file is empty")]
    Empty,

    #[error("The uploaded file is too large ({size} bytes, max {max})")]
    TooLarge { size: u64, max: u64 },

    #[error("Unsupported file type {0} (images only)")]
    UnsupportedType(String),

    #[error("Unsupported file extension .{0} (images only)")]
    UnsupportedExtension(String),

    #[error("The file content is not a supported image format")]
    UnrecognizedFormat,

    #[error("The image could not be decoded: {0}")]
    Decode(#[source] image::ImageError),
}

/// A validated, decoded upload.
#[derive(Debug, Clone)]
pub struct ValidatedPhoto {
    pub image: DynamicImage,
    pub format: ImageFormat,
}

/// Check an upload and decode it.
pub fn validate_upload(upload: &PhotoUpload, max_bytes: u64) -> Result<ValidatedPhoto, UploadError> {
    if upload.bytes.is_empty() {
        return Err(UploadError::Empty);
    }
    let size = upload.bytes.len() as u64;
    if size > max_bytes {
        return Err(UploadError::TooLarge {
            size,
            max: max_bytes,
        });
    }

    if let Some(declared) = upload.content_type.as_deref().map(str::trim) {
        if !declared.is_empty() && !declared.to_ascii_lowercase().starts_with("image/") {
            return Err(UploadError::UnsupportedType(declared.to_string()));
        }
    }

    if let Some(ext) = upload
        .filename
        .as_deref()
        .and_then(|name| Path::new(name).extension())
        .and_then(|e| e.to_str())
    {
        let is_image = mime_guess::from_ext(ext)
            .iter()
            .any(|m| m.type_() == mime_guess::mime::IMAGE);
        if !is_image {
            return Err(UploadError::UnsupportedExtension(ext.to_lowercase()));
        }
    }

    let format = image::guess_format(&upload.bytes).map_err(|_| UploadError::UnrecognizedFormat)?;
    if !format.reading_enabled() {
        return Err(UploadError::UnrecognizedFormat);
    }

    let image =
        image::load_from_memory_with_format(&upload.bytes, format).map_err(UploadError::Decode)?;
    tracing::debug!(
        ?format,
        size,
        width = image.width(),
        height = image.height(),
        "Upload accepted"
    );
    Ok(ValidatedPhoto { image, format })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn png() -> Vec<u8> {
        let img = RgbaImage::from_pixel(8, 6, Rgba([1, 2, 3, 255]));
        frame_compositor::encode::encode_png(&img).unwrap()
    }

    #[test]
    fn test_valid_png_is_decoded() {
        let upload = PhotoUpload::new(png())
            .with_filename("holiday.PNG")
            .with_content_type("image/png");
        let photo = validate_upload(&upload, 1024 * 1024).unwrap();
        assert_eq!(photo.format, ImageFormat::Png);
        assert_eq!((photo.image.width(), photo.image.height()), (8, 6));
    }

    #[test]
    fn test_empty_upload() {
        assert!(matches!(
            validate_upload(&PhotoUpload::new(Vec::new()), 100),
            Err(UploadError::Empty)
        ));
    }

    #[test]
    fn test_size_ceiling() {
        let bytes = png();
        let len = bytes.len() as u64;
        assert!(validate_upload(&PhotoUpload::new(bytes.clone()), len).is_ok());
        assert!(matches!(
            validate_upload(&PhotoUpload::new(bytes), len - 1),
            Err(UploadError::TooLarge { max, .. }) if max == len - 1
        ));
    }

    #[test]
    fn test_declared_type_must_be_image() {
        let upload = PhotoUpload::new(png()).with_content_type("application/pdf");
        assert!(matches!(
            validate_upload(&upload, u64::MAX),
            Err(UploadError::UnsupportedType(t)) if t == "application/pdf"
        ));
    }

    #[test]
    fn test_extension_must_be_image() {
        let upload = PhotoUpload::new(png()).with_filename("notes.TXT");
        assert!(matches!(
            validate_upload(&upload, u64::MAX),
            Err(UploadError::UnsupportedExtension(e)) if e == "txt"
        ));
    }

    #[test]
    fn test_content_must_be_image() {
        let upload = PhotoUpload::new(b"%PDF-1.7 pretending".to_vec()).with_filename("fake.png");
        assert!(matches!(
            validate_upload(&upload, u64::MAX),
            Err(UploadError::UnrecognizedFormat)
        ));
    }

    #[test]
    fn test_truncated_image_fails_decode() {
        let mut bytes = png();
        bytes.truncate(24);
        assert!(matches!(
            validate_upload(&PhotoUpload::new(bytes), u64::MAX),
            Err(UploadError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn test_from_path_guesses_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("me.png");
        std::fs::write(&path, png()).unwrap();
        let upload = PhotoUpload::from_path(&path).await.unwrap();
        assert_eq!(upload.filename.as_deref(), Some("me.png"));
        assert_eq!(upload.content_type.as_deref(), Some("image/png"));
        assert!(validate_upload(&upload, u64::MAX).is_ok());
    }
}
