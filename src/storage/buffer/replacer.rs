use crate::storage::page::PageId;
use std::fmt::Debug;

/// Eviction policy for cached pages.
pub trait Replacer: Send + Sync + Debug {
    /// Note that `page_id` was just used.
    fn record_access(&mut self, page_id: PageId);

    /// Select a page to evict and forget it. Returns None if nothing is tracked.
    fn evict(&mut self) -> Option<PageId>;

    /// Stop tracking `page_id`.
    fn remove(&mut self, page_id: PageId);

    /// Get the number of tracked pages.
    fn size(&self) -> usize;
}
