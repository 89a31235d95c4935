//! High-level operation flows
//!
//! Ties the scanner, the stores and the external collaborators together:
//! one flow at a time, cancellation surfaced as a distinguished outcome,
//! cleanup on every exit path via the lock guard.

use crate::feed::models::{MediaItem, MediaType, ScanMode};
use crate::feed::traits::FavoritesFeed;
use crate::flows::traits::{DownloadOrchestrator, OrganizedMedia, UpscaleApi};
use crate::scanner::events::{OperationEvent, OperationLog};
use crate::scanner::manager::MediaScanner;
use crate::scanner::session::{CancelToken, OperationGuard, OperationLock};
use crate::storage::batches::MetadataStore;
use crate::storage::kv::KeyValueStore;
use crate::storage::settings::PreferencesStore;
use crate::utils::error::FavloaderError;
use crate::utils::organizer;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Flat pacing delay between sequential upscale requests; a rate limit
/// toward the remote service, not a retry backoff.
const UPSCALE_PACING: Duration = Duration::from_millis(500);

/// Outcome of an upscale pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpscaleOutcome {
    pub requested: usize,
    pub failed: usize,
}

/// Orchestrates the save / organized-download / unsave / upscale flows.
///
/// Holds the single-operation lock: concurrent invocations are rejected
/// with `OperationInProgress` before any work starts.
pub struct FlowRunner {
    scanner: MediaScanner,
    lock: OperationLock,
    cancel: CancelToken,
    log: OperationLog,
    settings: PreferencesStore,
    store: MetadataStore,
    downloads: Option<Arc<dyn DownloadOrchestrator>>,
    upscaler: Option<Arc<dyn UpscaleApi>>,
}

impl FlowRunner {
    pub fn new(feed: Arc<dyn FavoritesFeed>, kv: Arc<dyn KeyValueStore>) -> Self {
        let cancel = CancelToken::new();
        let log = OperationLog::new();
        Self {
            scanner: MediaScanner::new(feed, cancel.clone(), log.clone()),
            lock: OperationLock::new(),
            cancel,
            log,
            settings: PreferencesStore::new(Arc::clone(&kv)),
            store: MetadataStore::new(kv),
            downloads: None,
            upscaler: None,
        }
    }

    pub fn with_downloads(mut self, downloads: Arc<dyn DownloadOrchestrator>) -> Self {
        self.downloads = Some(downloads);
        self
    }

    pub fn with_upscaler(mut self, upscaler: Arc<dyn UpscaleApi>) -> Self {
        self.upscaler = Some(upscaler);
        self
    }

    /// Token UI-facing callers use to abort the running flow.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn operation_log(&self) -> OperationLog {
        self.log.clone()
    }

    pub fn metadata(&self) -> &MetadataStore {
        &self.store
    }

    pub fn preferences(&self) -> &PreferencesStore {
        &self.settings
    }

    pub fn is_busy(&self) -> bool {
        self.lock.is_active()
    }

    /// Scan the feed and hand everything off for plain downloading.
    /// Returns the number of items handed over.
    pub async fn save_media(&self, mode: ScanMode) -> Result<usize> {
        let downloads = self.require_downloads()?;
        let _guard = self.begin("save")?;

        let result = async {
            let items = self.scanner.scan(mode).await?;
            if items.is_empty() {
                return Err(FavloaderError::NoMediaFound.into());
            }
            info!("Handing {} items to the download orchestrator", items.len());
            downloads.start_downloads(&items).await?;
            Ok(items.len())
        }
        .await;

        self.finish("save", &result);
        result
    }

    /// Compute organized paths for the given items, record them as a
    /// pending batch and hand them off for downloading. Returns the
    /// batch id.
    pub async fn download_organized(&self, items: Vec<MediaItem>) -> Result<String> {
        let downloads = self.require_downloads()?;
        let _guard = self.begin("organized download")?;

        let result = async {
            if items.is_empty() {
                return Err(FavloaderError::NoMediaFound.into());
            }

            let prefs = self.settings.preferences().await?;
            let organized: Vec<OrganizedMedia> = items
                .iter()
                .map(|item| OrganizedMedia {
                    item: item.clone(),
                    path: organizer::organized_path(item, &prefs),
                })
                .collect();

            let batch_id = MetadataStore::generate_batch_id();
            self.store.record_batch(&batch_id, &items, &prefs).await?;
            self.settings.record_downloads(&items).await?;

            info!(
                "Handing batch {} ({} items) to the download orchestrator",
                batch_id,
                organized.len()
            );
            downloads.start_downloads_with_organization(&organized).await?;
            Ok(batch_id)
        }
        .await;

        self.finish("organized download", &result);
        result
    }

    /// Run the unfavorite sweep. Returns the number of removed items.
    pub async fn unsave_all(&self) -> Result<u64> {
        let _guard = self.begin("unsave")?;
        let result = self.scanner.unsave_all().await;
        self.finish("unsave", &result);
        result
    }

    /// Scan for videos and request an upscale for each, sequentially.
    ///
    /// Only video items carrying a page id are eligible; per-item
    /// failures are counted and never abort the loop.
    pub async fn upscale_videos(&self) -> Result<UpscaleOutcome> {
        let upscaler = self.require_upscaler()?;
        let _guard = self.begin("upscale")?;

        let result = async {
            let media = self.scanner.scan(ScanMode::SaveVideos).await?;
            let videos: Vec<&MediaItem> = media
                .iter()
                .filter(|m| m.media_type() == MediaType::Video && m.id.is_some())
                .collect();
            if videos.is_empty() {
                return Err(FavloaderError::NoMediaFound.into());
            }

            info!("Requesting upscales for {} videos", videos.len());
            let mut outcome = UpscaleOutcome::default();
            for video in videos {
                if self.cancel.is_cancelled() {
                    return Err(FavloaderError::Cancelled.into());
                }

                let item_id = video.id.as_deref().unwrap_or_default();
                let accepted = match upscaler.request_upscale(item_id).await {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        warn!("Upscale request for {} failed: {}", item_id, e);
                        false
                    }
                };
                if accepted {
                    outcome.requested += 1;
                } else {
                    outcome.failed += 1;
                }
                self.log.record(OperationEvent::UpscaleRequested {
                    item_id: item_id.to_string(),
                    accepted,
                });

                tokio::time::sleep(UPSCALE_PACING).await;
            }

            Ok(outcome)
        }
        .await;

        self.finish("upscale", &result);
        result
    }

    fn begin(&self, operation: &'static str) -> Result<OperationGuard> {
        let Some(guard) = self.lock.try_acquire() else {
            warn!("Rejected {} flow: another operation is running", operation);
            return Err(FavloaderError::OperationInProgress.into());
        };
        self.cancel.reset();
        info!("Starting {} flow", operation);
        Ok(guard)
    }

    fn finish<T>(&self, operation: &'static str, result: &Result<T>) {
        match result {
            Ok(_) => info!("Finished {} flow", operation),
            Err(e) if FavloaderError::is_cancellation(e) => {
                self.log.record(OperationEvent::OperationCancelled {
                    operation: operation.to_string(),
                });
            }
            Err(e) => {
                error!("{} flow failed: {}", operation, e);
                self.log.record(OperationEvent::FlowFailed {
                    operation: operation.to_string(),
                    error: e.to_string(),
                });
            }
        }
    }

    fn require_downloads(&self) -> Result<Arc<dyn DownloadOrchestrator>> {
        self.downloads
            .clone()
            .ok_or_else(|| FavloaderError::CollaboratorMissing("download orchestrator").into())
    }

    fn require_upscaler(&self) -> Result<Arc<dyn UpscaleApi>> {
        self.upscaler
            .clone()
            .ok_or_else(|| FavloaderError::CollaboratorMissing("upscale api").into())
    }
}
