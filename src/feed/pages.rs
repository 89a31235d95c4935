//! Stall-bounded page iteration over a favorites feed

use crate::feed::models::RawNode;
use crate::feed::traits::FavoritesFeed;
use anyhow::Result;

/// Consecutive stalled load attempts before a feed counts as exhausted.
pub const MAX_STALLED_LOADS: u32 = 3;

/// Explicit iterator over the pages of a lazily loading feed.
///
/// The first page is whatever the feed currently renders; each further
/// page comes from a successful `load_more`. After `max_stalled`
/// consecutive attempts produce no new content the iterator terminates,
/// which bounds worst-case runtime on stalled or infinite feeds. Pages
/// may overlap on virtualized feeds; callers deduplicate.
pub struct FeedPages<'a> {
    feed: &'a dyn FavoritesFeed,
    max_stalled: u32,
    stalled: u32,
    primed: bool,
}

impl<'a> FeedPages<'a> {
    pub fn new(feed: &'a dyn FavoritesFeed) -> Self {
        Self::with_stall_bound(feed, MAX_STALLED_LOADS)
    }

    pub fn with_stall_bound(feed: &'a dyn FavoritesFeed, max_stalled: u32) -> Self {
        Self {
            feed,
            max_stalled,
            stalled: 0,
            primed: false,
        }
    }

    /// Next page of raw nodes, or `None` once the feed is exhausted.
    pub async fn next_page(&mut self) -> Result<Option<Vec<RawNode>>> {
        if !self.primed {
            self.primed = true;
            return Ok(Some(self.feed.current_items().await?));
        }

        while self.stalled < self.max_stalled {
            if self.feed.load_more().await? {
                self.stalled = 0;
                return Ok(Some(self.feed.current_items().await?));
            }
            self.stalled += 1;
        }

        Ok(None)
    }
}
