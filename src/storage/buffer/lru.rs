use super::replacer::Replacer;
use crate::storage::page::PageId;
use std::collections::{HashSet, VecDeque};

#[derive(Debug, Default)]
pub struct LruReplacer {
    /// Tracked pages, least recently used at front
    lru_list: VecDeque<PageId>,
    members: HashSet<PageId>,
}

impl LruReplacer {
    pub fn new(capacity: usize) -> Self {
        Self {
            lru_list: VecDeque::with_capacity(capacity),
            members: HashSet::with_capacity(capacity),
        }
    }
}

impl Replacer for LruReplacer {
    fn record_access(&mut self, page_id: PageId) {
        if !self.members.insert(page_id) {
            self.lru_list.retain(|p| *p != page_id);
        }
        self.lru_list.push_back(page_id);
    }

    fn evict(&mut self) -> Option<PageId> {
        let page_id = self.lru_list.pop_front()?;
        self.members.remove(&page_id);
        Some(page_id)
    }

    fn remove(&mut self, page_id: PageId) {
        if self.members.remove(&page_id) {
            self.lru_list.retain(|p| *p != page_id);
        }
    }

    fn size(&self) -> usize {
        self.lru_list.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::page::FileId;

    fn pid(page_no: u32) -> PageId {
        PageId::new(FileId(1), page_no)
    }

    #[test]
    fn test_evicts_in_access_order() {
        let mut replacer = LruReplacer::new(3);
        assert_eq!(replacer.evict(), None);

        replacer.record_access(pid(1));
        replacer.record_access(pid(2));
        replacer.record_access(pid(3));
        assert_eq!(replacer.size(), 3);

        assert_eq!(replacer.evict(), Some(pid(1)));
        assert_eq!(replacer.evict(), Some(pid(2)));
        assert_eq!(replacer.evict(), Some(pid(3)));
        assert_eq!(replacer.evict(), None);
    }

    #[test]
    fn test_access_refreshes_position() {
        let mut replacer = LruReplacer::new(3);
        replacer.record_access(pid(1));
        replacer.record_access(pid(2));
        replacer.record_access(pid(1));

        assert_eq!(replacer.size(), 2);
        assert_eq!(replacer.evict(), Some(pid(2)));
        assert_eq!(replacer.evict(), Some(pid(1)));
    }

    #[test]
    fn test_remove() {
        let mut replacer = LruReplacer::new(2);
        replacer.record_access(pid(1));
        replacer.record_access(pid(2));

        replacer.remove(pid(1));
        // removing an untracked page is a no-op
        replacer.remove(pid(99));

        assert_eq!(replacer.size(), 1);
        assert_eq!(replacer.evict(), Some(pid(2)));
    }
}
