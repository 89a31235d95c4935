//! Batch metadata persistence: recording, search, pruning and export

use crate::feed::models::{MediaItem, MediaType};
use crate::storage::kv::{read_key, write_key, KeyValueStore};
use crate::utils::config::OrganizationPreferences;
use crate::utils::error::FavloaderError;
use crate::utils::organizer::{self, DownloadManifest, ManifestItem};
use anyhow::Result;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Key holding the bounded list of batch summaries
const BATCH_LIST_KEY: &str = "download_batches";

/// Key prefix for per-batch manifests
const MANIFEST_KEY_PREFIX: &str = "metadata_";

/// Number of batch summaries kept before the oldest is evicted
const MAX_TRACKED_BATCHES: usize = 100;

/// Lifecycle of a recorded batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Pending,
    Complete,
    Failed,
}

impl BatchStatus {
    /// Final states accept no further transitions.
    pub fn is_final(self) -> bool {
        matches!(self, BatchStatus::Complete | BatchStatus::Failed)
    }
}

/// Summary record of one scan/download session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRecord {
    pub batch_id: String,
    pub created_at: DateTime<Utc>,
    pub item_count: usize,
    pub status: BatchStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Search filter over recorded batches; unset fields match everything
#[derive(Debug, Clone, Default)]
pub struct SearchCriteria {
    /// Case-insensitive substring match on the prompt.
    pub prompt: Option<String>,
    /// Exact match on the derived media type.
    pub media_type: Option<MediaType>,
    /// Inclusive lower date bound.
    pub date_from: Option<NaiveDate>,
    /// Inclusive upper date bound.
    pub date_to: Option<NaiveDate>,
}

impl SearchCriteria {
    fn matches(&self, item: &ManifestItem) -> bool {
        if let Some(needle) = &self.prompt {
            let Some(prompt) = &item.prompt else {
                return false;
            };
            if !prompt.to_lowercase().contains(&needle.to_lowercase()) {
                return false;
            }
        }

        if self.media_type.is_some_and(|t| t != item.media_type) {
            return false;
        }

        // unparseable item dates pass the date filters untouched
        if let Some(date) = organizer::parse_item_date(Some(&item.date)) {
            if self.date_from.is_some_and(|from| date < from) {
                return false;
            }
            if self.date_to.is_some_and(|to| date > to) {
                return false;
            }
        }

        true
    }
}

/// Items of one batch matching a search
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchMatches {
    pub batch_id: String,
    pub items: Vec<ManifestItem>,
}

/// Sole owner of persisted batch records, keyed by batch id over the
/// external key-value store.
pub struct MetadataStore {
    kv: Arc<dyn KeyValueStore>,
}

impl MetadataStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Fresh batch id for a download session.
    pub fn generate_batch_id() -> String {
        let suffix: String = Uuid::new_v4().simple().to_string().chars().take(9).collect();
        format!("batch_{}_{}", Utc::now().timestamp_millis(), suffix)
    }

    /// Record a scan result as a pending batch.
    ///
    /// Computes per-item filenames/types into the batch manifest,
    /// appends a summary record, enforces the retention cap and deletes
    /// manifests of evicted batches.
    pub async fn record_batch(
        &self,
        batch_id: &str,
        items: &[MediaItem],
        prefs: &OrganizationPreferences,
    ) -> Result<()> {
        let manifest = organizer::build_manifest(items, prefs);
        write_key(self.kv.as_ref(), &manifest_key(batch_id), &manifest).await?;

        let mut batches = self.batches().await?;
        batches.push(BatchRecord {
            batch_id: batch_id.to_string(),
            created_at: Utc::now(),
            item_count: items.len(),
            status: BatchStatus::Pending,
            updated_at: None,
        });

        let mut evicted_keys = Vec::new();
        while batches.len() > MAX_TRACKED_BATCHES {
            let evicted = batches.remove(0);
            evicted_keys.push(manifest_key(&evicted.batch_id));
        }
        if !evicted_keys.is_empty() {
            debug!("Evicting {} batch manifests", evicted_keys.len());
            let refs: Vec<&str> = evicted_keys.iter().map(String::as_str).collect();
            self.kv.remove(&refs).await?;
        }

        write_key(self.kv.as_ref(), BATCH_LIST_KEY, &batches).await?;
        info!("Recorded batch {} with {} items", batch_id, items.len());
        Ok(())
    }

    /// Transition a batch out of `pending`, exactly once.
    pub async fn update_status(&self, batch_id: &str, status: BatchStatus) -> Result<()> {
        let mut batches = self.batches().await?;
        let Some(record) = batches.iter_mut().find(|b| b.batch_id == batch_id) else {
            return Err(FavloaderError::BatchNotFound(batch_id.to_string()).into());
        };
        if record.status.is_final() {
            return Err(FavloaderError::BatchFinalized(batch_id.to_string()).into());
        }

        record.status = status;
        record.updated_at = Some(Utc::now());
        write_key(self.kv.as_ref(), BATCH_LIST_KEY, &batches).await?;
        debug!("Batch {} marked {:?}", batch_id, status);
        Ok(())
    }

    /// All retained batch summaries, oldest first.
    pub async fn batches(&self) -> Result<Vec<BatchRecord>> {
        Ok(read_key(self.kv.as_ref(), BATCH_LIST_KEY)
            .await?
            .unwrap_or_default())
    }

    /// Items recorded for one batch; empty when the manifest is gone.
    pub async fn batch_items(&self, batch_id: &str) -> Result<Vec<ManifestItem>> {
        let manifest: Option<DownloadManifest> =
            read_key(self.kv.as_ref(), &manifest_key(batch_id)).await?;
        Ok(manifest.map(|m| m.items).unwrap_or_default())
    }

    /// Search all retained batches.
    ///
    /// Results are grouped by originating batch; batches with no
    /// matching items are omitted from the output. Stored records are
    /// never mutated.
    pub async fn search(&self, criteria: &SearchCriteria) -> Result<Vec<BatchMatches>> {
        let mut results = Vec::new();
        for batch in self.batches().await? {
            let items: Vec<ManifestItem> = self
                .batch_items(&batch.batch_id)
                .await?
                .into_iter()
                .filter(|item| criteria.matches(item))
                .collect();
            if !items.is_empty() {
                results.push(BatchMatches {
                    batch_id: batch.batch_id,
                    items,
                });
            }
        }
        Ok(results)
    }

    /// Drop batches older than the cutoff and garbage-collect manifests
    /// no longer referenced by a retained batch. Returns the number of
    /// dropped summaries.
    pub async fn prune_older_than(&self, days: i64) -> Result<usize> {
        let cutoff = Utc::now() - Duration::days(days);
        let batches = self.batches().await?;
        let (retained, dropped): (Vec<BatchRecord>, Vec<BatchRecord>) = batches
            .into_iter()
            .partition(|batch| batch.created_at > cutoff);

        let retained_keys: std::collections::HashSet<String> = retained
            .iter()
            .map(|batch| manifest_key(&batch.batch_id))
            .collect();

        // orphaned manifests include those of batches dropped here and
        // any left behind by earlier interruptions
        let orphans: Vec<String> = self
            .kv
            .get_all()
            .await?
            .into_keys()
            .filter(|key| key.starts_with(MANIFEST_KEY_PREFIX) && !retained_keys.contains(key))
            .collect();

        write_key(self.kv.as_ref(), BATCH_LIST_KEY, &retained).await?;
        if !orphans.is_empty() {
            let refs: Vec<&str> = orphans.iter().map(String::as_str).collect();
            self.kv.remove(&refs).await?;
        }

        info!(
            "Pruned {} batches, removed {} manifests",
            dropped.len(),
            orphans.len()
        );
        Ok(dropped.len())
    }

    /// Export search results as pretty-printed JSON.
    pub fn export_search_json(results: &[BatchMatches]) -> Result<String> {
        Ok(serde_json::to_string_pretty(results)?)
    }

    /// Export search results as CSV
    /// (`BatchID,ID,Date,Type,Prompt,Filename,URL`).
    pub fn export_search_csv(results: &[BatchMatches]) -> String {
        let mut lines = vec!["BatchID,ID,Date,Type,Prompt,Filename,URL".to_string()];
        for result in results {
            for item in &result.items {
                lines.push(format!(
                    "{},{},{},{},{},{},{}",
                    result.batch_id,
                    item.id.as_deref().unwrap_or_default(),
                    item.date,
                    item.media_type.as_str(),
                    organizer::csv_escape(item.prompt.as_deref().unwrap_or_default()),
                    item.filename,
                    item.url,
                ));
            }
        }
        lines.join("\n")
    }
}

fn manifest_key(batch_id: &str) -> String {
    format!("{}{}", MANIFEST_KEY_PREFIX, batch_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::kv::MemoryStore;

    fn item(id: &str, url: &str, date: &str, prompt: &str) -> MediaItem {
        MediaItem {
            id: Some(id.to_string()),
            url: url.to_string(),
            date: Some(date.to_string()),
            prompt: Some(prompt.to_string()),
        }
    }

    fn store() -> MetadataStore {
        MetadataStore::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_batch_id_shape() {
        let id = MetadataStore::generate_batch_id();
        assert!(id.starts_with("batch_"));
        assert_eq!(id.split('_').count(), 3);
        assert_ne!(id, MetadataStore::generate_batch_id());
    }

    #[tokio::test]
    async fn test_record_and_read_back() {
        let store = store();
        let items = vec![
            item("a1", "https://x/a.mp4", "2024-03-05", "dawn"),
            item("a2", "https://x/b.jpg", "2024-03-06", "dusk"),
        ];
        store
            .record_batch("batch_1", &items, &OrganizationPreferences::default())
            .await
            .unwrap();

        let batches = store.batches().await.unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].status, BatchStatus::Pending);
        assert_eq!(batches[0].item_count, 2);

        let stored = store.batch_items("batch_1").await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].media_type, MediaType::Video);
        assert_eq!(stored[0].filename, "a1.mp4");
        assert_eq!(stored[1].media_type, MediaType::Image);
    }

    #[tokio::test]
    async fn test_status_transitions_once() {
        let store = store();
        store
            .record_batch(
                "batch_1",
                &[item("a1", "https://x/a.jpg", "2024-03-05", "p")],
                &OrganizationPreferences::default(),
            )
            .await
            .unwrap();

        store
            .update_status("batch_1", BatchStatus::Complete)
            .await
            .unwrap();
        let batches = store.batches().await.unwrap();
        assert_eq!(batches[0].status, BatchStatus::Complete);
        assert!(batches[0].updated_at.is_some());

        let err = store
            .update_status("batch_1", BatchStatus::Failed)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FavloaderError>(),
            Some(FavloaderError::BatchFinalized(_))
        ));

        let err = store
            .update_status("nope", BatchStatus::Complete)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FavloaderError>(),
            Some(FavloaderError::BatchNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_search_filters_by_type_without_mutation() {
        let store = store();
        let prefs = OrganizationPreferences::default();
        store
            .record_batch(
                "batch_1",
                &[
                    item("v1", "https://x/a.mp4", "2024-03-05", "mountain dawn"),
                    item("i1", "https://x/b.jpg", "2024-03-05", "mountain dusk"),
                ],
                &prefs,
            )
            .await
            .unwrap();
        store
            .record_batch(
                "batch_2",
                &[item("i2", "https://x/c.jpg", "2024-04-01", "ocean")],
                &prefs,
            )
            .await
            .unwrap();

        let criteria = SearchCriteria {
            media_type: Some(MediaType::Video),
            ..Default::default()
        };
        let results = store.search(&criteria).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].batch_id, "batch_1");
        assert_eq!(results[0].items.len(), 1);
        assert_eq!(results[0].items[0].id.as_deref(), Some("v1"));

        // batch_2 had no videos and is omitted; stored records untouched
        assert_eq!(store.batch_items("batch_2").await.unwrap().len(), 1);
        assert_eq!(store.batches().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_search_prompt_and_date_bounds() {
        let store = store();
        let prefs = OrganizationPreferences::default();
        store
            .record_batch(
                "batch_1",
                &[
                    item("a", "https://x/a.jpg", "2024-03-04", "Misty Mountains"),
                    item("b", "https://x/b.jpg", "2024-03-05", "misty ocean"),
                    item("c", "https://x/c.jpg", "2024-03-06", "desert"),
                ],
                &prefs,
            )
            .await
            .unwrap();

        let criteria = SearchCriteria {
            prompt: Some("misty".to_string()),
            date_from: NaiveDate::from_ymd_opt(2024, 3, 5),
            date_to: NaiveDate::from_ymd_opt(2024, 3, 5),
            ..Default::default()
        };
        let results = store.search(&criteria).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].items.len(), 1);
        assert_eq!(results[0].items[0].id.as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn test_search_export_csv_columns() {
        let results = vec![BatchMatches {
            batch_id: "batch_1".to_string(),
            items: vec![ManifestItem {
                id: Some("a1".to_string()),
                url: "https://x/a.mp4".to_string(),
                filename: "a1.mp4".to_string(),
                date: "2024-03-05".to_string(),
                prompt: Some("say \"hi\"".to_string()),
                media_type: MediaType::Video,
            }],
        }];

        let csv = MetadataStore::export_search_csv(&results);
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("BatchID,ID,Date,Type,Prompt,Filename,URL")
        );
        let row = lines.next().unwrap();
        assert_eq!(
            row,
            "batch_1,a1,2024-03-05,video,\"say \"\"hi\"\"\",a1.mp4,https://x/a.mp4"
        );
    }
}
