//! Preference and download-history persistence

use crate::feed::models::MediaItem;
use crate::storage::batches::BatchStatus;
use crate::storage::kv::{read_key, write_key, KeyValueStore};
use crate::utils::config::OrganizationPreferences;
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Key namespace shared with the historical settings UI
const STORAGE_PREFIX: &str = "grok_favorites_";

/// Download history entries kept before the oldest are dropped
const MAX_HISTORY_ENTRIES: usize = 1000;

/// One downloaded item as remembered in the history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadHistoryEntry {
    #[serde(flatten)]
    pub item: MediaItem,
    pub downloaded_at: DateTime<Utc>,
    pub status: BatchStatus,
}

/// Preference and history access over the key-value store
pub struct PreferencesStore {
    kv: Arc<dyn KeyValueStore>,
}

impl PreferencesStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Stored preferences merged over defaults; defaults when absent.
    pub async fn preferences(&self) -> Result<OrganizationPreferences> {
        Ok(read_key(self.kv.as_ref(), &prefixed("preferences"))
            .await?
            .unwrap_or_default())
    }

    pub async fn save_preferences(&self, prefs: &OrganizationPreferences) -> Result<()> {
        write_key(self.kv.as_ref(), &prefixed("preferences"), prefs).await?;
        debug!("Preferences saved");
        Ok(())
    }

    /// Full download history, oldest first.
    pub async fn download_history(&self) -> Result<Vec<DownloadHistoryEntry>> {
        Ok(read_key(self.kv.as_ref(), &prefixed("downloadHistory"))
            .await?
            .unwrap_or_default())
    }

    /// Append items to the history as pending downloads, keeping only
    /// the newest entries once the cap is reached.
    pub async fn record_downloads(&self, items: &[MediaItem]) -> Result<()> {
        let mut history = self.download_history().await?;
        let now = Utc::now();
        history.extend(items.iter().map(|item| DownloadHistoryEntry {
            item: item.clone(),
            downloaded_at: now,
            status: BatchStatus::Pending,
        }));

        if history.len() > MAX_HISTORY_ENTRIES {
            history.drain(..history.len() - MAX_HISTORY_ENTRIES);
        }

        write_key(self.kv.as_ref(), &prefixed("downloadHistory"), &history).await
    }
}

fn prefixed(key: &str) -> String {
    format!("{}{}", STORAGE_PREFIX, key)
}
