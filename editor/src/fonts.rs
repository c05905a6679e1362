//! Caption font loading.
//!
//! Every `.ttf`/`.otf` file in the fonts directory is registered under its
//! file stem, so a frame asking for `font: "Poppins"` finds `Poppins.ttf`.

use std::path::{Path, PathBuf};

use ab_glyph::FontArc;
use frame_compositor::FontBook;

const MAX_FONT_SIZE: u64 = 50 * 1024 * 1024; // 50MB
const VALID_EXTENSIONS: &[&str] = &[".ttf", ".otf"];

#[derive(Debug, thiserror::Error)]
pub enum FontError {
    #[error("Invalid font format (only TTF/OTF supported): {0}")]
    InvalidFormat(String),
    #[error("Font file too large (max 50MB): {0}")]
    FileTooLarge(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn has_font_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
        .is_some_and(|ext| VALID_EXTENSIONS.contains(&ext.as_str()))
}

fn read_font(path: &Path) -> Result<FontArc, FontError> {
    if !has_font_extension(path) {
        return Err(FontError::InvalidFormat(path.display().to_string()));
    }
    if std::fs::metadata(path)?.len() > MAX_FONT_SIZE {
        return Err(FontError::FileTooLarge(path.display().to_string()));
    }
    let data = std::fs::read(path)?;
    FontArc::try_from_vec(data).map_err(|_| FontError::InvalidFormat(path.display().to_string()))
}

/// Font files in `dir`, sorted by name. A missing directory yields none.
fn font_files(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        tracing::debug!(dir = %dir.display(), "Fonts directory not found");
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_file() && has_font_extension(p))
        .collect();
    files.sort();
    files
}

/// Build the caption font book.
///
/// `default_font` becomes the fallback for unknown families; without one the
/// first font of the directory is used. Unreadable files in the directory are
/// skipped with a warning, an unreadable default font is an error.
pub fn load_font_book(fonts_dir: &Path, default_font: Option<&Path>) -> Result<FontBook, FontError> {
    let mut book = FontBook::new();
    let mut first = None;

    for path in font_files(fonts_dir) {
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        match read_font(&path) {
            Ok(font) => {
                first.get_or_insert_with(|| font.clone());
                book.insert(stem, font);
            }
            Err(e) => tracing::warn!(error = %e, "Skipping font"),
        }
    }

    match default_font {
        Some(path) => book.set_fallback(read_font(path)?),
        None => {
            if let Some(font) = first {
                book.set_fallback(font);
            }
        }
    }

    tracing::info!(families = ?book.families(), "Caption fonts loaded");
    Ok(book)
}
