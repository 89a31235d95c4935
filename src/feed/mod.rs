//! Feed abstraction: raw node shapes, classification and page iteration

pub mod classifier;
pub mod models;
pub mod pages;
pub mod traits;

pub use classifier::{classify, post_id_from_permalink, ClassifiedMedia};
pub use models::{MediaItem, MediaSource, MediaType, RawNode, ScanMode};
pub use pages::{FeedPages, MAX_STALLED_LOADS};
pub use traits::FavoritesFeed;
