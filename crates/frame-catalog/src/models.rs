//! Wire shapes of catalog responses.
//!
//! Catalog services differ in whether they wrap payloads, so both the bare
//! and the wrapped (`frames` / `data`) forms are accepted.

use frame_compositor::FrameTemplate;
use serde::{Deserialize, Serialize};

/// Response of the frame list endpoint.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum FrameList {
    Bare(Vec<FrameTemplate>),
    Wrapped {
        #[serde(alias = "data")]
        frames: Vec<FrameTemplate>,
    },
}

impl FrameList {
    pub fn into_frames(self) -> Vec<FrameTemplate> {
        match self {
            Self::Bare(frames) | Self::Wrapped { frames } => frames,
        }
    }
}

/// Response of the single-frame endpoint.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum FrameEnvelope {
    Wrapped {
        #[serde(alias = "data")]
        frame: FrameTemplate,
    },
    Bare(FrameTemplate),
}

impl FrameEnvelope {
    pub fn into_frame(self) -> FrameTemplate {
        match self {
            Self::Bare(frame) | Self::Wrapped { frame } => frame,
        }
    }
}

/// Body sent with a usage record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageRecord<'a> {
    pub frame_id: &'a str,
}
