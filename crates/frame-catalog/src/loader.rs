//! Image loading for compositor layers.
//!
//! Supports `http(s)://` URLs, `file://` URLs, plain filesystem paths and
//! base64 `data:` URIs.

use std::path::PathBuf;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use frame_compositor::{ImageLoader, LoadError};
use image::DynamicImage;
use url::Url;

/// [`ImageLoader`] that fetches over HTTP or reads from disk.
#[derive(Debug, Clone)]
pub struct RemoteImageLoader {
    http: reqwest::Client,
}

impl RemoteImageLoader {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }

    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    async fn fetch(&self, reference: &str) -> Result<Vec<u8>, LoadError> {
        let http_error = |e: reqwest::Error| LoadError::Http {
            reference: reference.to_string(),
            message: e.to_string(),
        };
        let resp = self.http.get(reference).send().await.map_err(http_error)?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(LoadError::NotFound(reference.to_string()));
        }
        if !status.is_success() {
            return Err(LoadError::Status {
                reference: reference.to_string(),
                status: status.as_u16(),
            });
        }
        let bytes = resp.bytes().await.map_err(http_error)?;
        Ok(bytes.to_vec())
    }

    async fn read_file(&self, reference: &str, path: PathBuf) -> Result<Vec<u8>, LoadError> {
        tokio::fs::read(&path).await.map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                LoadError::NotFound(reference.to_string())
            } else {
                LoadError::Io {
                    reference: reference.to_string(),
                    source,
                }
            }
        })
    }
}

/// Decode the payload of a base64 `data:` URI.
pub fn decode_data_uri(reference: &str) -> Result<Vec<u8>, LoadError> {
    let invalid = || LoadError::InvalidReference(truncate(reference));
    let rest = reference.strip_prefix("data:").ok_or_else(invalid)?;
    let (meta, payload) = rest.split_once(',').ok_or_else(invalid)?;
    if !meta.split(';').any(|p| p.eq_ignore_ascii_case("base64")) {
        return Err(invalid());
    }
    STANDARD.decode(payload.trim()).map_err(|_| invalid())
}

fn truncate(reference: &str) -> String {
    match reference.char_indices().nth(64) {
        Some((idx, _)) => format!("{}...", &reference[..idx]),
        None => reference.to_string(),
    }
}

impl ImageLoader for RemoteImageLoader {
    async fn load(&self, reference: &str) -> Result<DynamicImage, LoadError> {
        let bytes = if reference.starts_with("data:") {
            decode_data_uri(reference)?
        } else if reference.starts_with("http://") || reference.starts_with("https://") {
            self.fetch(reference).await?
        } else if reference.starts_with("file://") {
            let path = Url::parse(reference)
                .ok()
                .and_then(|url| url.to_file_path().ok())
                .ok_or_else(|| LoadError::InvalidReference(reference.to_string()))?;
            self.read_file(reference, path).await?
        } else if reference.contains("://") || reference.trim().is_empty() {
            return Err(LoadError::InvalidReference(truncate(reference)));
        } else {
            self.read_file(reference, PathBuf::from(reference)).await?
        };

        tracing::debug!(reference = %truncate(reference), bytes = bytes.len(), "Image fetched");
        Ok(image::load_from_memory(&bytes)?)
    }
}
