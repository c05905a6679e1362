//! Long-lived services shared by every editing session.

use std::sync::Arc;

use frame_catalog::{Catalog, Favorites, JsonFileStore, RemoteImageLoader};
use frame_compositor::Compositor;

use crate::config::AppConfig;
use crate::fonts::load_font_book;
use crate::session::{EditorSession, SessionOptions};

/// Application state built once from [`AppConfig`].
#[derive(Clone)]
pub struct SharedState {
    inner: Arc<SharedStateInner>,
}

struct SharedStateInner {
    config: AppConfig,
    compositor: Compositor,
    loader: RemoteImageLoader,
    catalog: Option<Catalog>,
}

impl SharedState {
    /// Load fonts, build the HTTP loader and open the configured catalog.
    pub async fn init(config: AppConfig) -> Result<Self, anyhow::Error> {
        let fonts = load_font_book(&config.fonts_dir, config.default_font_path.as_deref())?;
        let loader = RemoteImageLoader::new(config.http_timeout)?;
        let catalog = match config.catalog_location() {
            Some(location) => Some(Catalog::open(location, config.http_timeout).await?),
            None => {
                tracing::warn!("No frame catalog configured (FRAME_CATALOG_URL / FRAME_CATALOG_FILE)");
                None
            }
        };

        Ok(Self {
            inner: Arc::new(SharedStateInner {
                compositor: Compositor::new(Arc::new(fonts)),
                loader,
                catalog,
                config,
            }),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    pub fn compositor(&self) -> &Compositor {
        &self.inner.compositor
    }

    pub fn loader(&self) -> &RemoteImageLoader {
        &self.inner.loader
    }

    pub fn catalog(&self) -> Option<&Catalog> {
        self.inner.catalog.as_ref()
    }

    /// Favorites persisted in the data directory.
    pub fn favorites(&self) -> Result<Favorites<JsonFileStore>, frame_catalog::StoreError> {
        Ok(Favorites::new(JsonFileStore::open(self.inner.config.favorites_path())?))
    }

    /// A fresh session using the configured limits.
    pub fn new_session(&self) -> EditorSession {
        EditorSession::new(SessionOptions {
            max_upload_bytes: self.inner.config.max_upload_bytes,
            pixel_ratio: self.inner.config.pixel_ratio,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_init_with_local_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let catalog_path = dir.path().join("frames.json");
        std::fs::write(&catalog_path, "[]").unwrap();

        let config = AppConfig {
            catalog_file: catalog_path.display().to_string(),
            data_dir: dir.path().to_path_buf(),
            fonts_dir: dir.path().join("fonts"),
            max_upload_bytes: 1234,
            pixel_ratio: 2.0,
            ..AppConfig::default()
        };
        let state = SharedState::init(config).await.unwrap();
        assert!(matches!(state.catalog(), Some(Catalog::Local(_))));
        assert!(state.favorites().unwrap().list().unwrap().is_empty());

        let session = state.new_session();
        assert_eq!(session.options().max_upload_bytes, 1234);
        assert_eq!(session.options().pixel_ratio, 2.0);
    }

    #[tokio::test]
    async fn test_init_without_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            data_dir: dir.path().to_path_buf(),
            fonts_dir: dir.path().join("fonts"),
            ..AppConfig::default()
        };
        let state = SharedState::init(config).await.unwrap();
        assert!(state.catalog().is_none());
    }
}
