//! HTTP client for the frame catalog service.
//!
//! Endpoints, relative to the configured base URL:
//! `GET frames`, `GET frames/{id}` and `POST frames/{id}/usage`.

use std::time::Duration;

use frame_compositor::FrameTemplate;
use url::Url;

use crate::models::{FrameEnvelope, FrameList, UsageRecord};
use crate::{CatalogError, Result, checked};

/// Frame catalog client.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    http: reqwest::Client,
    base: Url,
}

impl CatalogClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(http, Url::parse(base_url)?))
    }

    pub fn with_client(http: reqwest::Client, base: Url) -> Self {
        Self { http, base }
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| CatalogError::UrlParse(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_body(&self, url: Url) -> Result<(reqwest::StatusCode, String)> {
        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        Ok((status, body))
    }

    /// All frames offered by the catalog.
    ///
    /// Entries that fail validation are skipped with a warning rather than
    /// failing the whole list.
    pub async fn list_frames(&self) -> Result<Vec<FrameTemplate>> {
        let url = self.endpoint(&["frames"])?;
        let (status, body) = self.get_body(url).await?;
        if !status.is_success() {
            return Err(CatalogError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        let frames: Vec<FrameTemplate> = serde_json::from_str::<FrameList>(&body)?
            .into_frames()
            .into_iter()
            .filter_map(|frame| match checked(frame) {
                Ok(frame) => Some(frame),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping invalid catalog frame");
                    None
                }
            })
            .collect();
        tracing::info!(count = frames.len(), "Catalog frames fetched");
        Ok(frames)
    }

    /// A single frame by id.
    pub async fn get_frame(&self, id: &str) -> Result<FrameTemplate> {
        let url = self.endpoint(&["frames", id])?;
        let (status, body) = self.get_body(url).await?;

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(CatalogError::NotFound(id.to_string()));
        }
        if !status.is_success() {
            return Err(CatalogError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        checked(serde_json::from_str::<FrameEnvelope>(&body)?.into_frame())
    }

    /// Tell the catalog that `id` was used for a delivered composite.
    pub async fn record_usage(&self, id: &str) -> Result<()> {
        let url = self.endpoint(&["frames", id, "usage"])?;
        let resp = self
            .http
            .post(url)
            .json(&UsageRecord { frame_id: id })
            .send()
            .await?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(CatalogError::NotFound(id.to_string()));
        }
        if !status.is_success() {
            let message = resp.text().await?;
            return Err(CatalogError::ApiError {
                status: status.as_u16(),
                message,
            });
        }
        tracing::debug!(frame_id = id, "Usage recorded");
        Ok(())
    }

    /// Resolve a template image reference against the catalog base.
    ///
    /// Absolute URLs (including `data:`) are returned unchanged.
    pub fn resolve_asset_url(&self, reference: &str) -> Result<String> {
        match Url::parse(reference) {
            Ok(url) => Ok(url.into()),
            Err(url::ParseError::RelativeUrlWithoutBase) => Ok(self.base.join(reference)?.into()),
            Err(e) => Err(e.into()),
        }
    }
}
