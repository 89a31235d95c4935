use crate::feed::models::RawNode;
use anyhow::Result;
use async_trait::async_trait;

/// Host page abstraction for the favorites feed
///
/// This trait isolates the scanner from the rendering engine:
/// implementations wrap a live gallery page, a paginated API, or a test
/// fixture.
#[async_trait]
pub trait FavoritesFeed: Send + Sync {
    /// Raw nodes currently rendered by the feed.
    ///
    /// Virtualized feeds may drop earlier nodes as new content loads;
    /// callers deduplicate across calls.
    async fn current_items(&self) -> Result<Vec<RawNode>>;

    /// Trigger loading of additional content (scroll, "load more").
    ///
    /// Returns `true` when new content appeared, `false` when the feed
    /// stayed as it was. Implementations wait for the page to settle
    /// before answering.
    async fn load_more(&self) -> Result<bool>;

    /// Remove (unfavorite) a single item.
    ///
    /// Mutates the underlying feed: remaining items shift position, so
    /// callers must re-query `current_items` afterwards.
    async fn remove_item(&self, node: &RawNode) -> Result<()>;
}
