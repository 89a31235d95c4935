//! Persistence: key-value boundary, batch metadata and preferences

pub mod batches;
pub mod kv;
pub mod settings;

pub use batches::{BatchMatches, BatchRecord, BatchStatus, MetadataStore, SearchCriteria};
pub use kv::{JsonFileStore, KeyValueStore, MemoryStore};
pub use settings::{DownloadHistoryEntry, PreferencesStore};
