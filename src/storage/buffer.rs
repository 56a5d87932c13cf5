pub mod lru;
pub mod replacer;

use crate::catalog::Catalog;
use crate::concurrency::lock::{LockManager, LockMode};
use crate::config::HeapConfig;
use crate::storage::error::StorageResult;
use crate::storage::page::{HeapPage, PageId};
use crate::transaction::{Permission, TransactionId};
use dashmap::DashMap;
use log::{debug, trace};
use parking_lot::Mutex;
use replacer::Replacer;
use std::sync::Arc;
use std::time::Duration;

/// Source of decoded pages for scans and other page consumers.
pub trait PageCache: Send + Sync {
    /// Return the page, holding a lock on it for `txn` that matches `permission`.
    /// May block while another transaction holds a conflicting lock.
    fn fetch_page(
        &self,
        txn: TransactionId,
        page_id: PageId,
        permission: Permission,
    ) -> StorageResult<Arc<HeapPage>>;
}

/// Bounded cache of decoded pages with page-level locking.
///
/// Pages are read through the catalog's files on a miss. Cached pages are
/// never dirty, so eviction simply drops the least recently used one.
#[derive(Clone)]
pub struct BufferPool {
    inner: Arc<BufferPoolInner>,
}

struct BufferPoolInner {
    catalog: Arc<Catalog>,
    pages: DashMap<PageId, Arc<HeapPage>>,
    replacer: Mutex<Box<dyn Replacer>>,
    lock_manager: LockManager,
    max_pages: usize,
    lock_timeout: Option<Duration>,
}

impl BufferPool {
    pub fn new(catalog: Arc<Catalog>, config: &HeapConfig) -> StorageResult<Self> {
        config.validate()?;
        let replacer = Box::new(lru::LruReplacer::new(config.buffer_pool_pages));
        Ok(Self::with_replacer(catalog, config, replacer))
    }

    pub fn with_replacer(
        catalog: Arc<Catalog>,
        config: &HeapConfig,
        replacer: Box<dyn Replacer>,
    ) -> Self {
        Self {
            inner: Arc::new(BufferPoolInner {
                catalog,
                pages: DashMap::with_capacity(config.buffer_pool_pages),
                replacer: Mutex::new(replacer),
                lock_manager: LockManager::new(),
                max_pages: config.buffer_pool_pages,
                lock_timeout: config.lock_timeout(),
            }),
        }
    }

    /// This pool as a shareable [`PageCache`] handle.
    pub fn shared(&self) -> Arc<dyn PageCache> {
        Arc::new(self.clone())
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.inner.catalog
    }

    /// Release every lock `txn` holds. Called when the transaction commits or aborts.
    pub fn transaction_complete(&self, txn: TransactionId) {
        debug!("releasing locks of {}", txn);
        self.inner.lock_manager.release_all_locks(txn);
    }

    /// Release a single page lock early.
    pub fn release_page(&self, txn: TransactionId, page_id: PageId) -> bool {
        self.inner.lock_manager.release_lock(txn, page_id)
    }

    pub fn holds_lock(&self, txn: TransactionId, page_id: PageId) -> bool {
        self.inner
            .lock_manager
            .holds_lock(txn, page_id, LockMode::Shared)
    }

    /// Drop a page from the cache without touching locks.
    pub fn discard_page(&self, page_id: PageId) {
        self.inner.pages.remove(&page_id);
        self.inner.replacer.lock().remove(page_id);
    }

    pub fn is_cached(&self, page_id: PageId) -> bool {
        self.inner.pages.contains_key(&page_id)
    }

    /// Number of cached pages.
    pub fn len(&self) -> usize {
        self.inner.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.pages.is_empty()
    }

    fn make_room(&self) {
        while self.inner.pages.len() >= self.inner.max_pages {
            let Some(victim) = self.inner.replacer.lock().evict() else {
                break;
            };
            debug!("evicting {}", victim);
            self.inner.pages.remove(&victim);
        }
    }
}

impl PageCache for BufferPool {
    fn fetch_page(
        &self,
        txn: TransactionId,
        page_id: PageId,
        permission: Permission,
    ) -> StorageResult<Arc<HeapPage>> {
        self.inner.lock_manager.acquire_lock(
            txn,
            page_id,
            permission.lock_mode(),
            self.inner.lock_timeout,
        )?;

        if let Some(page) = self.inner.pages.get(&page_id).map(|e| Arc::clone(e.value())) {
            trace!("cache hit {}", page_id);
            self.inner.replacer.lock().record_access(page_id);
            return Ok(page);
        }

        trace!("cache miss {}", page_id);
        let file = self.inner.catalog.file(page_id.file_id)?;
        let page = Arc::new(file.read_page(page_id)?);

        self.make_room();
        self.inner.pages.insert(page_id, Arc::clone(&page));
        self.inner.replacer.lock().record_access(page_id);

        Ok(page)
    }
}
