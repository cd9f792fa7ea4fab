use async_trait::async_trait;
use thiserror::Error;

use gridgrant_core_types::GridError;
use gridgrant_lifecycle::{LifecycleError, StatusReport};

/// A single fetch attempt failed. The poller retries; the error never
/// escalates beyond the permission being observed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PollError {
    #[error("status fetch failed: {0}")]
    Fetch(String),
}

impl From<GridError> for PollError {
    fn from(value: GridError) -> Self {
        PollError::Fetch(value.to_string())
    }
}

impl From<LifecycleError> for PollError {
    fn from(value: LifecycleError) -> Self {
        PollError::Fetch(value.to_string())
    }
}

/// Seam between the poller and whatever transport reaches the permission
/// administrator. One fetcher observes one permission.
#[async_trait]
pub trait StatusFetch: Send + Sync {
    async fn fetch_status(&self) -> Result<StatusReport, PollError>;
}

#[async_trait]
impl<T: StatusFetch + ?Sized> StatusFetch for std::sync::Arc<T> {
    async fn fetch_status(&self) -> Result<StatusReport, PollError> {
        (**self).fetch_status().await
    }
}
