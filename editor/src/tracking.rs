//! Frame usage tracking.
//!
//! Tracking is best-effort: callers log failures and carry on, a delivered
//! composite is never held back by the catalog being unreachable.

use std::future::Future;

use frame_catalog::{Catalog, CatalogError};

#[derive(Debug, thiserror::Error)]
pub enum TrackingError {
    #[error("Usage tracking failed: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Usage tracking failed: {0}")]
    Other(String),
}

/// Receives a notification each time a composite made with a frame is delivered.
pub trait UsageTracker {
    fn record_usage(&self, frame_id: &str) -> impl Future<Output = Result<(), TrackingError>> + Send;
}

/// Tracker that records nothing, used when tracking is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracker;

impl UsageTracker for NoopTracker {
    async fn record_usage(&self, frame_id: &str) -> Result<(), TrackingError> {
        tracing::debug!(frame_id, "Usage tracking disabled");
        Ok(())
    }
}

impl UsageTracker for Catalog {
    async fn record_usage(&self, frame_id: &str) -> Result<(), TrackingError> {
        Catalog::record_usage(self, frame_id).await?;
        Ok(())
    }
}

/// Record usage, logging instead of returning a failure.
pub async fn track_best_effort<T: UsageTracker>(tracker: &T, frame_id: &str) -> bool {
    match tracker.record_usage(frame_id).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, frame_id, "Failed to record frame usage");
            false
        }
    }
}
