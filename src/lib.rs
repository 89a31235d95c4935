//! favloader library
//!
//! Core of a favorites media manager: feed scanning and classification,
//! organized download paths, batch metadata persistence, and the
//! unfavorite/upscale flows. The host page, the download subsystem, the
//! blob store and the upscale service all stay behind traits.

pub mod feed;
pub mod flows;
pub mod scanner;
pub mod storage;
pub mod utils;

// Re-export main types for easier use
pub use feed::{ClassifiedMedia, FavoritesFeed, MediaItem, MediaType, RawNode, ScanMode};
pub use flows::{DownloadOrchestrator, FlowRunner, OrganizedMedia, UpscaleApi, UpscaleOutcome};
pub use scanner::{CancelToken, MediaScanner, OperationLock, OperationLog};
pub use storage::{
    BatchStatus, JsonFileStore, KeyValueStore, MemoryStore, MetadataStore, PreferencesStore,
    SearchCriteria,
};
pub use utils::{FavloaderError, OrganizationPreferences};
