//! Offline catalog backed by a JSON file.

use std::path::{Path, PathBuf};

use frame_compositor::FrameTemplate;

use crate::models::FrameList;
use crate::{CatalogError, Result, checked};

/// Frames read from a local JSON document.
///
/// Relative template references resolve against the document's directory.
#[derive(Debug, Clone)]
pub struct LocalCatalog {
    base_dir: PathBuf,
    frames: Vec<FrameTemplate>,
}

impl LocalCatalog {
    pub async fn open(path: &Path) -> Result<Self> {
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| CatalogError::Io {
                path: path.display().to_string(),
                source,
            })?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let catalog = Self::from_json(&json, base_dir)?;
        tracing::info!(
            path = %path.display(),
            count = catalog.frames.len(),
            "Local catalog loaded"
        );
        Ok(catalog)
    }

    /// Parse a catalog document. Invalid frames are skipped with a warning.
    pub fn from_json(json: &str, base_dir: impl Into<PathBuf>) -> Result<Self> {
        let frames = serde_json::from_str::<FrameList>(json)?
            .into_frames()
            .into_iter()
            .filter_map(|frame| match checked(frame) {
                Ok(frame) => Some(frame),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping invalid local frame");
                    None
                }
            })
            .collect();
        Ok(Self {
            base_dir: base_dir.into(),
            frames,
        })
    }

    pub fn frames(&self) -> &[FrameTemplate] {
        &self.frames
    }

    pub fn get(&self, id: &str) -> Option<&FrameTemplate> {
        self.frames.iter().find(|f| f.id == id)
    }

    /// Resolve a template reference; URLs and absolute paths pass through.
    pub fn resolve_asset(&self, reference: &str) -> String {
        if reference.contains("://") || reference.starts_with("data:") {
            return reference.to_string();
        }
        let path = Path::new(reference);
        if path.is_absolute() {
            return reference.to_string();
        }
        self.base_dir.join(path).display().to_string()
    }
}
