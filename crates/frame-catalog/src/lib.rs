//! Frame catalog access.
//!
//! Provides the remote catalog client, an offline JSON catalog, an
//! [`ImageLoader`](frame_compositor::ImageLoader) for remote and local
//! image references, and the favorites store.

pub mod client;
pub mod favorites;
pub mod loader;
pub mod local;
pub mod models;

use std::path::Path;
use std::time::Duration;

use frame_compositor::{FrameError, FrameTemplate};

pub use client::CatalogClient;
pub use favorites::{Favorites, JsonFileStore, KeyValueStore, MemoryStore, StoreError};
pub use loader::RemoteImageLoader;
pub use local::LocalCatalog;

/// Unified error type for the frame-catalog crate.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Catalog API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Frame not found: {0}")]
    NotFound(String),

    #[error("Frame {id} is invalid: {source}")]
    InvalidFrame {
        id: String,
        #[source]
        source: FrameError,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

pub type Result<T> = std::result::Result<T, CatalogError>;

/// Reject a template that cannot be composited.
pub(crate) fn checked(frame: FrameTemplate) -> Result<FrameTemplate> {
    match frame.validate() {
        Ok(()) => Ok(frame),
        Err(source) => Err(CatalogError::InvalidFrame {
            id: frame.id,
            source,
        }),
    }
}

/// Either a remote catalog service or a local JSON file.
#[derive(Debug, Clone)]
pub enum Catalog {
    Remote(CatalogClient),
    Local(LocalCatalog),
}

impl Catalog {
    /// Open `location`: `http(s)://` URLs go to the service, anything else is a file.
    pub async fn open(location: &str, timeout: Duration) -> Result<Self> {
        if location.starts_with("http://") || location.starts_with("https://") {
            Ok(Self::Remote(CatalogClient::new(location, timeout)?))
        } else {
            Ok(Self::Local(LocalCatalog::open(Path::new(location)).await?))
        }
    }

    pub async fn list_frames(&self) -> Result<Vec<FrameTemplate>> {
        match self {
            Self::Remote(client) => client.list_frames().await,
            Self::Local(local) => Ok(local.frames().to_vec()),
        }
    }

    pub async fn get_frame(&self, id: &str) -> Result<FrameTemplate> {
        match self {
            Self::Remote(client) => client.get_frame(id).await,
            Self::Local(local) => local
                .get(id)
                .cloned()
                .ok_or_else(|| CatalogError::NotFound(id.to_string())),
        }
    }

    /// Record a use of `id`. Local catalogs have nothing to record.
    pub async fn record_usage(&self, id: &str) -> Result<()> {
        match self {
            Self::Remote(client) => client.record_usage(id).await,
            Self::Local(_) => Ok(()),
        }
    }

    /// Absolute reference for the template image of `frame`.
    pub fn template_reference(&self, frame: &FrameTemplate) -> Result<String> {
        match self {
            Self::Remote(client) => client.resolve_asset_url(&frame.template_image_url),
            Self::Local(local) => Ok(local.resolve_asset(&frame.template_image_url)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"{ "frames": [{
        "id": 3,
        "templateImageUrl": "three.png",
        "dimensions": { "width": 300, "height": 300 },
        "placementRect": { "x": 25, "y": 25, "width": 250, "height": 200 }
    }] }"#;

    #[tokio::test]
    async fn test_open_local_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frames.json");
        std::fs::write(&path, DOC).unwrap();

        let catalog = Catalog::open(path.to_str().unwrap(), Duration::from_secs(1))
            .await
            .unwrap();
        assert!(matches!(catalog, Catalog::Local(_)));

        let frame = catalog.get_frame("3").await.unwrap();
        assert_eq!(catalog.list_frames().await.unwrap(), vec![frame.clone()]);
        assert_eq!(
            catalog.template_reference(&frame).unwrap(),
            dir.path().join("three.png").display().to_string()
        );
        catalog.record_usage("3").await.unwrap();
        assert!(matches!(
            catalog.get_frame("4").await,
            Err(CatalogError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_open_remote_catalog() {
        let catalog = Catalog::open("https://catalog.test/api/", Duration::from_secs(1))
            .await
            .unwrap();
        let Catalog::Remote(client) = &catalog else {
            panic!("expected a remote catalog");
        };
        assert_eq!(client.base_url().as_str(), "https://catalog.test/api/");
    }

    #[test]
    fn test_checked_reports_frame_id() {
        let mut frame: FrameTemplate = serde_json::from_str::<models::FrameList>(DOC)
            .unwrap()
            .into_frames()
            .remove(0);
        frame.placement_rect.width = 0;
        let err = checked(frame).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidFrame { ref id, .. } if id == "3"));
    }
}
