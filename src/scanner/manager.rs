//! Favorites feed scanner: media collection and the unfavorite sweep

use crate::feed::classifier::classify;
use crate::feed::models::{MediaItem, ScanMode};
use crate::feed::pages::{FeedPages, MAX_STALLED_LOADS};
use crate::feed::traits::FavoritesFeed;
use crate::scanner::events::{OperationEvent, OperationLog};
use crate::scanner::session::CancelToken;
use crate::utils::error::FavloaderError;
use anyhow::Result;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Flat pacing delay between sequential removals during the sweep.
/// A rate limit toward the host page, not a retry backoff.
const UNSAVE_PACING: Duration = Duration::from_millis(250);

/// Walks the live feed, normalizes discovered nodes into media items and
/// runs the unfavorite sweep. The single-operation flag is owned by the
/// calling layer; the scanner only honors the shared cancellation token.
pub struct MediaScanner {
    feed: Arc<dyn FavoritesFeed>,
    cancel: CancelToken,
    log: OperationLog,
}

impl MediaScanner {
    pub fn new(feed: Arc<dyn FavoritesFeed>, cancel: CancelToken, log: OperationLog) -> Self {
        Self { feed, cancel, log }
    }

    /// Collect favorited media of the requested types.
    ///
    /// Idempotent per page state: repeated scans without page mutation
    /// yield the same set. Results are deduplicated by page id (URL for
    /// id-less items) in discovery order. Nodes the classifier rejects
    /// are logged and skipped; cancellation fails fast with `Cancelled`.
    pub async fn scan(&self, mode: ScanMode) -> Result<Vec<MediaItem>> {
        info!("Starting scan in {:?} mode", mode);
        self.log.record(OperationEvent::ScanStarted { mode });

        let mut pages = FeedPages::new(self.feed.as_ref());
        let mut seen: HashSet<String> = HashSet::new();
        let mut items: Vec<MediaItem> = Vec::new();

        loop {
            if self.cancel.is_cancelled() {
                info!("Scan cancelled after {} items", items.len());
                return Err(FavloaderError::Cancelled.into());
            }

            let Some(page) = pages.next_page().await? else {
                break;
            };
            debug!("Inspecting page of {} nodes", page.len());

            for node in &page {
                let classified = match classify(node) {
                    Ok(media) => media,
                    Err(e) => {
                        debug!("Skipping feed node: {}", e);
                        self.log.record(OperationEvent::NodeSkipped {
                            reason: e.to_string(),
                        });
                        continue;
                    }
                };

                if !mode.admits(classified.media_type) {
                    continue;
                }

                let (date, prompt) = node.annotations();
                let item = MediaItem {
                    id: classified.id,
                    url: classified.url,
                    date: date.map(str::to_string),
                    prompt: prompt.map(str::to_string),
                };
                if seen.insert(item.dedup_key().to_string()) {
                    items.push(item);
                }
            }
        }

        info!("Scan finished with {} unique items", items.len());
        self.log.record(OperationEvent::ScanCompleted {
            item_count: items.len(),
        });
        Ok(items)
    }

    /// Remove every favorited item, one at a time.
    ///
    /// The live list is re-queried after each removal because removal
    /// shifts feed positions; a stale index would skip or double-process
    /// items. Failed removals are logged and the stuck node skipped; the
    /// returned count covers successful removals only. Once the visible
    /// list is exhausted the sweep probes `load_more` up to the stall
    /// bound before finishing.
    pub async fn unsave_all(&self) -> Result<u64> {
        info!("Starting unfavorite sweep");
        let mut removed: u64 = 0;
        let mut skipped: usize = 0;
        let mut stalled: u32 = 0;

        loop {
            if self.cancel.is_cancelled() {
                info!("Sweep cancelled after {} removals", removed);
                return Err(FavloaderError::Cancelled.into());
            }

            let nodes = self.feed.current_items().await?;
            if nodes.len() <= skipped {
                if stalled >= MAX_STALLED_LOADS {
                    break;
                }
                if self.feed.load_more().await? {
                    stalled = 0;
                } else {
                    stalled += 1;
                }
                continue;
            }

            let node = &nodes[skipped];
            match self.feed.remove_item(node).await {
                Ok(()) => {
                    removed += 1;
                    debug!("Removed item ({} so far)", removed);
                }
                Err(e) => {
                    // leave the stuck card in place and move past it
                    warn!("Failed to remove item: {}", e);
                    self.log.record(OperationEvent::RemovalFailed {
                        error: e.to_string(),
                    });
                    skipped += 1;
                }
            }

            tokio::time::sleep(UNSAVE_PACING).await;
        }

        info!("Sweep finished, {} items removed", removed);
        self.log
            .record(OperationEvent::SweepCompleted { removed });
        Ok(removed)
    }
}
