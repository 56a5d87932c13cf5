//! Sequential scan over every record of a heap file.

use crate::access::tuple::Record;
use crate::storage::buffer::PageCache;
use crate::storage::disk::DbFile;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::{HeapPageRecords, PageId};
use crate::transaction::{Permission, TransactionId};
use log::{debug, trace};
use std::sync::Arc;

/// A restartable, forward-only cursor over the records of a file.
pub trait DbFileIterator {
    fn open(&mut self) -> StorageResult<()>;

    /// Whether another record is available. False when not open.
    fn has_next(&mut self) -> StorageResult<bool>;

    /// The next record, `Ok(None)` once the file is exhausted, and
    /// [`StorageError::IteratorNotOpen`] before `open` or after `close`.
    fn next_record(&mut self) -> StorageResult<Option<Record>>;

    fn rewind(&mut self) -> StorageResult<()>;

    fn close(&mut self);
}

enum ScanState {
    Unopened,
    /// Open, but `page_no` still has to be fetched. A failed fetch stays here
    /// so the next call retries the same page.
    Pending { page_no: u32 },
    Positioned {
        page_no: u32,
        records: HeapPageRecords,
    },
    Exhausted,
    Closed,
}

/// Scans a heap file page by page through a [`PageCache`].
///
/// Pages are fetched lazily with [`Permission::ReadOnly`], in increasing page
/// order. The page count is re-read each time the scan crosses a page
/// boundary.
pub struct HeapScan {
    file: Arc<dyn DbFile>,
    cache: Arc<dyn PageCache>,
    txn: TransactionId,
    state: ScanState,
    peeked: Option<Record>,
    // set once the Iterator adapter has reported IteratorNotOpen
    not_open_reported: bool,
}

impl HeapScan {
    pub fn new(file: Arc<dyn DbFile>, cache: Arc<dyn PageCache>, txn: TransactionId) -> Self {
        Self {
            file,
            cache,
            txn,
            state: ScanState::Unopened,
            peeked: None,
            not_open_reported: false,
        }
    }

    pub fn txn(&self) -> TransactionId {
        self.txn
    }

    pub fn is_open(&self) -> bool {
        !matches!(self.state, ScanState::Unopened | ScanState::Closed)
    }

    /// Page the cursor is on (or about to fetch), if any.
    pub fn current_page(&self) -> Option<u32> {
        match &self.state {
            ScanState::Pending { page_no } | ScanState::Positioned { page_no, .. } => {
                Some(*page_no)
            }
            _ => None,
        }
    }

    fn fetch(&mut self, page_no: u32) -> StorageResult<()> {
        let page_id = PageId::new(self.file.file_id(), page_no);
        trace!("{} fetching {}", self.txn, page_id);

        let page = self
            .cache
            .fetch_page(self.txn, page_id, Permission::ReadOnly)?;
        self.state = ScanState::Positioned {
            page_no,
            records: page.records(),
        };
        Ok(())
    }

    fn read_next(&mut self) -> StorageResult<Option<Record>> {
        loop {
            match &mut self.state {
                ScanState::Unopened | ScanState::Closed | ScanState::Exhausted => return Ok(None),
                ScanState::Pending { page_no } => {
                    let page_no = *page_no;
                    self.fetch(page_no)?;
                }
                ScanState::Positioned { page_no, records } => {
                    if let Some(record) = records.next() {
                        return Ok(Some(record));
                    }

                    let next = *page_no + 1;
                    self.state = if next < self.file.num_pages()? {
                        ScanState::Pending { page_no: next }
                    } else {
                        ScanState::Exhausted
                    };
                }
            }
        }
    }
}

impl DbFileIterator for HeapScan {
    fn open(&mut self) -> StorageResult<()> {
        debug!("{} opening scan of {}", self.txn, self.file.file_id());
        self.peeked = None;
        self.not_open_reported = false;
        self.state = ScanState::Pending { page_no: 0 };

        if self.file.num_pages()? == 0 {
            self.state = ScanState::Exhausted;
            return Ok(());
        }
        self.fetch(0)
    }

    fn has_next(&mut self) -> StorageResult<bool> {
        if !self.is_open() {
            return Ok(false);
        }
        if self.peeked.is_none() {
            self.peeked = self.read_next()?;
        }
        Ok(self.peeked.is_some())
    }

    fn next_record(&mut self) -> StorageResult<Option<Record>> {
        if !self.is_open() {
            return Err(StorageError::IteratorNotOpen);
        }
        match self.peeked.take() {
            Some(record) => Ok(Some(record)),
            None => self.read_next(),
        }
    }

    fn rewind(&mut self) -> StorageResult<()> {
        self.close();
        self.open()
    }

    fn close(&mut self) {
        if self.is_open() {
            debug!("{} closing scan of {}", self.txn, self.file.file_id());
        }
        self.peeked = None;
        self.state = ScanState::Closed;
    }
}

/// On a scan that is not open, yields `Err(IteratorNotOpen)` once and then
/// `None` until the scan is opened again.
///
/// A failed page fetch is yielded as `Some(Err(..))` and the following call
/// retries the same page, so a caller that skips errors keeps retrying for as
/// long as the fetch keeps failing.
impl Iterator for HeapScan {
    type Item = StorageResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.is_open() {
            if self.not_open_reported {
                return None;
            }
            self.not_open_reported = true;
            return Some(Err(StorageError::IteratorNotOpen));
        }
        self.next_record().transpose()
    }
}
