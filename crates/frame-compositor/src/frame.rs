//! Frame template records as delivered by the frame catalog.
//!
//! A template is immutable for the duration of an editing session. The
//! compositor only reads its geometry and caption style; catalog metadata
//! such as the display name is carried through untouched.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::FrameError;
use crate::geometry::AspectRatio;

/// Pixel size of the composited output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Sub-rectangle of the output canvas where the photo is drawn beneath the template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PlacementRect {
    /// Aspect ratio the crop selection must be locked to.
    pub fn aspect_ratio(&self) -> Option<AspectRatio> {
        AspectRatio::new(f64::from(self.width) / f64::from(self.height))
    }
}

/// Caption rectangle and font parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextStyle {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    #[serde(default = "default_font")]
    pub font: String,
    pub font_size: f32,
    #[serde(default = "default_color")]
    pub color: String,
}

fn default_font() -> String {
    "sans-serif".into()
}

fn default_color() -> String {
    "#000000".into()
}

/// A frame descriptor: overlay image, output size, photo placement and caption style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameTemplate {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub template_image_url: String,
    pub dimensions: Dimensions,
    pub placement_rect: PlacementRect,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_style: Option<TextStyle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_count: Option<u64>,
}

impl FrameTemplate {
    /// Check the geometric invariants of the template.
    pub fn validate(&self) -> Result<(), FrameError> {
        if self.id.trim().is_empty() {
            return Err(FrameError::MissingId);
        }

        let Dimensions { width, height } = self.dimensions;
        if width == 0 || height == 0 {
            return Err(FrameError::EmptyDimensions { width, height });
        }

        let p = self.placement_rect;
        if p.width == 0 || p.height == 0 {
            return Err(FrameError::EmptyPlacement {
                width: p.width,
                height: p.height,
            });
        }
        if !fits(p.x, p.width, width) || !fits(p.y, p.height, height) {
            return Err(FrameError::PlacementOutOfBounds {
                x: p.x,
                y: p.y,
                width: p.width,
                height: p.height,
                canvas_width: width,
                canvas_height: height,
            });
        }

        if let Some(style) = &self.text_style {
            if style.width == 0 || style.height == 0 {
                return Err(FrameError::InvalidTextStyle(format!(
                    "text rectangle must be non-zero, got {}x{}",
                    style.width, style.height
                )));
            }
            if !fits(style.x, style.width, width) || !fits(style.y, style.height, height) {
                return Err(FrameError::InvalidTextStyle(
                    "text rectangle exceeds the output canvas".into(),
                ));
            }
            if !style.font_size.is_finite() || style.font_size <= 0.0 {
                return Err(FrameError::InvalidTextStyle(format!(
                    "font size must be positive, got {}",
                    style.font_size
                )));
            }
        }

        Ok(())
    }

    /// Aspect ratio of the placement rectangle.
    pub fn aspect_ratio(&self) -> Option<AspectRatio> {
        self.placement_rect.aspect_ratio()
    }

    /// Name for display purposes, falling back to the id.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.id)
    }
}

fn fits(offset: u32, len: u32, total: u32) -> bool {
    u64::from(offset) + u64::from(len) <= u64::from(total)
}

/// Catalogs disagree on whether ids are strings or numbers.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Int(u64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Int(n) => n.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FrameTemplate {
        FrameTemplate {
            id: "classic".into(),
            template_image_url: "https://cdn.example.com/frames/classic.png".into(),
            dimensions: Dimensions {
                width: 1080,
                height: 1350,
            },
            placement_rect: PlacementRect {
                x: 90,
                y: 120,
                width: 900,
                height: 900,
            },
            text_style: Some(TextStyle {
                x: 90,
                y: 1100,
                width: 900,
                height: 120,
                font: "Poppins".into(),
                font_size: 48.0,
                color: "#ffffff".into(),
            }),
            name: Some("Classic".into()),
            category: None,
            usage_count: None,
        }
    }

    #[test]
    fn test_parses_catalog_record() {
        let json = r##"{
            "id": 42,
            "templateImageUrl": "/uploads/frame-42.png",
            "dimensions": { "width": 1000, "height": 1000 },
            "placementRect": { "x": 100, "y": 100, "width": 800, "height": 600 },
            "textStyle": { "x": 0, "y": 900, "width": 1000, "height": 100, "fontSize": 32 }
        }"##;
        let frame: FrameTemplate = serde_json::from_str(json).unwrap();
        assert_eq!(frame.id, "42");
        assert_eq!(frame.placement_rect.width, 800);
        let style = frame.text_style.as_ref().unwrap();
        assert_eq!(style.font, "sans-serif");
        assert_eq!(style.color, "#000000");
        assert!(frame.validate().is_ok());
    }

    #[test]
    fn test_valid_template_passes() {
        assert_eq!(sample().validate(), Ok(()));
    }

    #[test]
    fn test_placement_must_fit_canvas() {
        let mut frame = sample();
        frame.placement_rect.x = 200;
        assert!(matches!(
            frame.validate(),
            Err(FrameError::PlacementOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_placement_touching_edge_is_valid() {
        let mut frame = sample();
        frame.placement_rect = PlacementRect {
            x: 180,
            y: 450,
            width: 900,
            height: 900,
        };
        assert!(frame.validate().is_ok());
    }

    #[test]
    fn test_empty_placement_rejected() {
        let mut frame = sample();
        frame.placement_rect.height = 0;
        assert!(matches!(
            frame.validate(),
            Err(FrameError::EmptyPlacement { .. })
        ));
    }

    #[test]
    fn test_text_style_font_size_must_be_positive() {
        let mut frame = sample();
        if let Some(style) = frame.text_style.as_mut() {
            style.font_size = 0.0;
        }
        assert!(matches!(
            frame.validate(),
            Err(FrameError::InvalidTextStyle(_))
        ));
    }

    #[test]
    fn test_display_name_falls_back_to_id() {
        let mut frame = sample();
        assert_eq!(frame.display_name(), "Classic");
        frame.name = None;
        assert_eq!(frame.display_name(), "classic");
    }
}
