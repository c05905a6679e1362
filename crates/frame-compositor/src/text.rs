//! Caption rendering: font lookup, color parsing, centered single-line text.
//!
//! Captions are centered on the template's text rectangle. Text wider than
//! the rectangle is shrunk to fit (down to [`MIN_CAPTION_PX`]) and whatever
//! still overflows is clipped to the rectangle.

use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use ab_glyph::{Font, FontArc, PxScale, ScaleFont};
use image::{Rgba, imageops};
use imageproc::drawing::draw_text_mut;
use regex::Regex;
use tracing::debug;

use crate::canvas::Canvas;
use crate::error::ComposeError;
use crate::frame::TextStyle;

/// Smallest logical font size shrink-to-fit will go down to.
pub const MIN_CAPTION_PX: f32 = 8.0;

static RE_HEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#([0-9A-Fa-f]{3}|[0-9A-Fa-f]{4}|[0-9A-Fa-f]{6}|[0-9A-Fa-f]{8})$").unwrap()
});
static RE_RGB: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^rgba?\(\s*(\d{1,3})\s*,\s*(\d{1,3})\s*,\s*(\d{1,3})\s*(?:,\s*([0-9]*\.?[0-9]+)\s*)?\)$",
    )
    .unwrap()
});

/// Fonts available for captions, keyed by normalized family name.
#[derive(Clone, Default)]
pub struct FontBook {
    fonts: HashMap<String, FontArc>,
    fallback: Option<FontArc>,
}

impl fmt::Debug for FontBook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FontBook")
            .field("families", &self.families())
            .field("has_fallback", &self.fallback.is_some())
            .finish()
    }
}

impl FontBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `font` under `family`. Later registrations win.
    pub fn insert(&mut self, family: &str, font: FontArc) {
        self.fonts.insert(normalize_family(family), font);
    }

    /// Whether `family` is registered, ignoring the fallback.
    pub fn contains(&self, family: &str) -> bool {
        self.fonts.contains_key(&normalize_family(family))
    }

    /// Font used when no registered family matches.
    pub fn set_fallback(&mut self, font: FontArc) {
        self.fallback = Some(font);
    }

    pub fn with_fallback(mut self, font: FontArc) -> Self {
        self.set_fallback(font);
        self
    }

    /// Resolve a CSS-style family list (`"Poppins", Arial, sans-serif`).
    pub fn resolve(&self, family: &str) -> Option<&FontArc> {
        std::iter::once(family)
            .chain(family.split(','))
            .map(normalize_family)
            .find_map(|name| self.fonts.get(&name))
            .or(self.fallback.as_ref())
    }

    pub fn families(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.fonts.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty() && self.fallback.is_none()
    }
}

/// Lowercase, trimmed, unquoted family name.
pub fn normalize_family(family: &str) -> String {
    family
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim()
        .to_lowercase()
}

/// Parse a CSS color: `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`, `rgb()`, `rgba()` or a basic name.
pub fn parse_color(value: &str) -> Option<Rgba<u8>> {
    let value = value.trim();

    if let Some(caps) = RE_HEX.captures(value) {
        let hex = &caps[1];
        let nibble = |i: usize| u8::from_str_radix(&hex[i..=i], 16).ok().map(|v| v * 17);
        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        return match hex.len() {
            3 => Some(Rgba([nibble(0)?, nibble(1)?, nibble(2)?, 255])),
            4 => Some(Rgba([nibble(0)?, nibble(1)?, nibble(2)?, nibble(3)?])),
            6 => Some(Rgba([byte(0)?, byte(2)?, byte(4)?, 255])),
            _ => Some(Rgba([byte(0)?, byte(2)?, byte(4)?, byte(6)?])),
        };
    }

    if let Some(caps) = RE_RGB.captures(value) {
        let channel = |i: usize| caps[i].parse::<u16>().ok().filter(|v| *v <= 255).map(|v| v as u8);
        let alpha = match caps.get(4) {
            Some(a) => {
                let a: f32 = a.as_str().parse().ok()?;
                (a.clamp(0.0, 1.0) * 255.0).round() as u8
            }
            None => 255,
        };
        return Some(Rgba([channel(1)?, channel(2)?, channel(3)?, alpha]));
    }

    let named = match value.to_ascii_lowercase().as_str() {
        "black" => [0, 0, 0, 255],
        "white" => [255, 255, 255, 255],
        "red" => [255, 0, 0, 255],
        "green" => [0, 128, 0, 255],
        "blue" => [0, 0, 255, 255],
        "yellow" => [255, 255, 0, 255],
        "orange" => [255, 165, 0, 255],
        "gold" => [255, 215, 0, 255],
        "gray" | "grey" => [128, 128, 128, 255],
        "transparent" => [0, 0, 0, 0],
        _ => return None,
    };
    Some(Rgba(named))
}

/// Measure the advance width of a string at the given font and scale.
pub fn measure_text_width<F: Font>(font: &F, scale: PxScale, text: &str) -> f32 {
    let scaled = font.as_scaled(scale);
    let mut width = 0.0f32;
    let mut prev_glyph: Option<ab_glyph::GlyphId> = None;

    for ch in text.chars() {
        let glyph_id = scaled.glyph_id(ch);
        if let Some(prev) = prev_glyph {
            width += scaled.kern(prev, glyph_id);
        }
        width += scaled.h_advance(glyph_id);
        prev_glyph = Some(glyph_id);
    }

    width
}

/// Height of the ascent-to-descent box for the given font and scale.
pub fn line_height<F: Font>(font: &F, scale: PxScale) -> f32 {
    let scaled = font.as_scaled(scale);
    scaled.ascent() - scaled.descent()
}

/// Largest size not above `requested` at which `text` fits `max_width`, floored at `min`.
pub fn fit_font_size<F: Font>(font: &F, text: &str, requested: f32, max_width: f32, min: f32) -> f32 {
    let width = measure_text_width(font, PxScale::from(requested), text);
    if width <= max_width || width <= 0.0 {
        return requested;
    }
    (requested * max_width / width).max(min).min(requested)
}

/// A caption whose font and color have been resolved up front.
#[derive(Clone)]
pub(crate) struct PreparedCaption {
    text: String,
    font: FontArc,
    color: Rgba<u8>,
    style: TextStyle,
}

/// Resolve font and color for a caption. Empty captions are no caption at all.
pub(crate) fn prepare_caption(
    book: &FontBook,
    style: Option<&TextStyle>,
    text: Option<&str>,
) -> Result<Option<PreparedCaption>, ComposeError> {
    let Some(text) = text.filter(|t| !t.trim().is_empty()) else {
        return Ok(None);
    };
    let Some(style) = style else {
        debug!("Frame has no text style, caption ignored");
        return Ok(None);
    };

    let font = book
        .resolve(&style.font)
        .cloned()
        .ok_or_else(|| ComposeError::FontUnavailable(style.font.clone()))?;
    let color =
        parse_color(&style.color).ok_or_else(|| ComposeError::InvalidColor(style.color.clone()))?;

    Ok(Some(PreparedCaption {
        text: text.to_string(),
        font,
        color,
        style: style.clone(),
    }))
}

/// Draw a prepared caption centered on its text rectangle, clipped to it.
pub(crate) fn draw_caption(canvas: &mut Canvas, caption: &PreparedCaption) {
    let style = &caption.style;
    let ratio = canvas.pixel_ratio();
    let rect = canvas.physical_rect(
        f64::from(style.x),
        f64::from(style.y),
        f64::from(style.width),
        f64::from(style.height),
    );

    let (buf_w, buf_h) = canvas.physical_size();
    let x0 = rect.x.clamp(0, i64::from(buf_w));
    let y0 = rect.y.clamp(0, i64::from(buf_h));
    let x1 = (rect.x + i64::from(rect.width)).clamp(0, i64::from(buf_w));
    let y1 = (rect.y + i64::from(rect.height)).clamp(0, i64::from(buf_h));
    if x1 <= x0 || y1 <= y0 {
        return;
    }

    let px = fit_font_size(
        &caption.font,
        &caption.text,
        style.font_size * ratio,
        rect.width as f32,
        MIN_CAPTION_PX * ratio,
    );
    let scale = PxScale::from(px);
    let text_w = measure_text_width(&caption.font, scale, &caption.text);
    let line_h = line_height(&caption.font, scale);
    debug!(
        requested = style.font_size * ratio,
        px, text_w, "Drawing caption"
    );

    // Draw into a copy of the text rectangle so overflow is clipped.
    let (rx, ry) = (x0 as u32, y0 as u32);
    let (rw, rh) = ((x1 - x0) as u32, (y1 - y0) as u32);
    let mut region = imageops::crop_imm(canvas.buffer(), rx, ry, rw, rh).to_image();

    let center_x = rect.x as f32 + rect.width as f32 / 2.0 - x0 as f32;
    let center_y = rect.y as f32 + rect.height as f32 / 2.0 - y0 as f32;
    let tx = (center_x - text_w / 2.0).round() as i32;
    let ty = (center_y - line_h / 2.0).round() as i32;
    draw_text_mut(
        &mut region,
        caption.color,
        tx,
        ty,
        scale,
        &caption.font,
        &caption.text,
    );

    imageops::replace(canvas.buffer_mut(), &region, x0, y0);
}
