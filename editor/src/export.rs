//! Writing finished composites to disk.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::{DateTime, TimeZone};
use frame_compositor::{CompositeOutput, FrameTemplate};
use regex::Regex;

static RE_NON_SLUG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("PNG encoding failed: {0}")]
    Encode(#[from] image::ImageError),

    #[error("Failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Download name for a composite made with `frame`: `<frame-slug>-<timestamp>.png`.
pub fn download_filename<Tz: TimeZone>(frame: &FrameTemplate, at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let lowered = frame.display_name().to_lowercase();
    let slug = RE_NON_SLUG.replace_all(&lowered, "-");
    let slug = slug.trim_matches('-');
    let slug = if slug.is_empty() { "frame" } else { slug };
    format!("{slug}-{}.png", at.format("%Y%m%d-%H%M%S"))
}

/// Encode `output` as PNG and write it to `path`, creating parent directories.
pub async fn write_output(output: &CompositeOutput, path: &Path) -> Result<PathBuf, ExportError> {
    let png = output.encode_png()?;
    let io_error = |source| ExportError::Io {
        path: path.display().to_string(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(io_error)?;
    }
    tokio::fs::write(path, &png).await.map_err(io_error)?;
    tracing::info!(path = %path.display(), bytes = png.len(), "Composite written");
    Ok(path.to_path_buf())
}
