use crate::feed::models::MediaItem;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A media item paired with its computed destination path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganizedMedia {
    #[serde(flatten)]
    pub item: MediaItem,
    /// Relative `folder/filename` destination.
    pub path: String,
}

/// External download subsystem
///
/// Receives ordered item lists; transfer retries and parallelism are its
/// concern, not the core's.
#[async_trait]
pub trait DownloadOrchestrator: Send + Sync {
    /// Hand off items for plain downloading.
    async fn start_downloads(&self, media: &[MediaItem]) -> Result<()>;

    /// Hand off items with pre-computed organized paths.
    async fn start_downloads_with_organization(&self, media: &[OrganizedMedia]) -> Result<()>;
}

/// Remote upscale service
#[async_trait]
pub trait UpscaleApi: Send + Sync {
    /// Request an upscale for one item; `false` when the service declines.
    async fn request_upscale(&self, item_id: &str) -> Result<bool>;
}
