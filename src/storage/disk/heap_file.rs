use crate::access::scan::HeapScan;
use crate::access::tuple::Record;
use crate::access::value::Value;
use crate::catalog::schema::Schema;
use crate::config::HeapConfig;
use crate::storage::buffer::PageCache;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::{FileId, HeapPage, PageId};
use crate::transaction::TransactionId;
use log::debug;
use std::fs::File;
use std::hash::Hasher;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use twox_hash::XxHash64;

/// Read access to a file made of fixed-size pages.
pub trait DbFile: Send + Sync {
    /// Stable identity of the file, used as the file half of every [`PageId`].
    fn file_id(&self) -> FileId;

    fn schema(&self) -> &Arc<Schema>;

    fn page_size(&self) -> usize;

    /// Number of pages, derived from the current file length.
    fn num_pages(&self) -> StorageResult<u32>;

    fn read_page(&self, page_id: PageId) -> StorageResult<HeapPage>;
}

/// Mutating operations a page cache would call on write paths.
pub trait DbFileMut {
    fn write_page(&self, page: &HeapPage) -> StorageResult<()>;

    /// Returns the pages dirtied by the insert.
    fn insert_record(&self, txn: TransactionId, values: Vec<Value>) -> StorageResult<Vec<PageId>>;

    /// Returns the page dirtied by the delete.
    fn delete_record(&self, txn: TransactionId, record: &Record) -> StorageResult<PageId>;
}

/// A heap file: an unordered collection of records stored on fixed-size pages.
///
/// Page `i` occupies bytes `[i * page_size, (i + 1) * page_size)` of the
/// backing file. There is no file header.
#[derive(Debug)]
pub struct HeapFile {
    path: PathBuf,
    schema: Arc<Schema>,
    page_size: usize,
}

impl HeapFile {
    pub fn new(
        path: impl AsRef<Path>,
        schema: Arc<Schema>,
        config: &HeapConfig,
    ) -> StorageResult<Self> {
        config.validate()?;

        let record_size = schema.record_size();
        if record_size == 0 || HeapPage::slot_count_for(config.page_size, record_size) == 0 {
            return Err(StorageError::InvalidConfig(format!(
                "records of {record_size} bytes do not fit on {} byte pages",
                config.page_size
            )));
        }

        Ok(Self {
            path: resolve_path(path.as_ref())?,
            schema,
            page_size: config.page_size,
        })
    }

    /// The resolved path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Byte offset of a page within the file.
    pub fn page_offset(&self, page_no: u32) -> u64 {
        page_no as u64 * self.page_size as u64
    }

    /// Start a scan over every record of the file under `txn`.
    pub fn iterator(self: &Arc<Self>, txn: TransactionId, cache: Arc<dyn PageCache>) -> HeapScan {
        HeapScan::new(Arc::clone(self) as Arc<dyn DbFile>, cache, txn)
    }
}

impl DbFile for HeapFile {
    fn file_id(&self) -> FileId {
        file_id_for_path(&self.path)
    }

    fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    fn page_size(&self) -> usize {
        self.page_size
    }

    fn num_pages(&self) -> StorageResult<u32> {
        let file_size = std::fs::metadata(&self.path)?.len();
        let pages = file_size.div_ceil(self.page_size as u64);
        Ok(u32::try_from(pages).unwrap_or(u32::MAX))
    }

    fn read_page(&self, page_id: PageId) -> StorageResult<HeapPage> {
        let num_pages = self.num_pages()?;
        if page_id.file_id != self.file_id() || page_id.page_no >= num_pages {
            return Err(StorageError::InvalidPageAddress { page_id, num_pages });
        }

        let io_err = |source| StorageError::Io {
            page_id: Some(page_id),
            source,
        };

        let offset = self.page_offset(page_id.page_no);
        let mut buf = vec![0u8; self.page_size];
        {
            let mut file = File::open(&self.path).map_err(io_err)?;
            file.seek(SeekFrom::Start(offset)).map_err(io_err)?;
            file.read_exact(&mut buf).map_err(io_err)?;
        }
        debug!("read {} at offset {}", page_id, offset);

        HeapPage::decode(page_id, Arc::clone(&self.schema), self.page_size, &buf)
    }
}

impl DbFileMut for HeapFile {
    fn write_page(&self, _page: &HeapPage) -> StorageResult<()> {
        Err(StorageError::MutationNotSupported {
            operation: "write_page",
        })
    }

    fn insert_record(
        &self,
        _txn: TransactionId,
        _values: Vec<Value>,
    ) -> StorageResult<Vec<PageId>> {
        Err(StorageError::MutationNotSupported {
            operation: "insert_record",
        })
    }

    fn delete_record(&self, _txn: TransactionId, _record: &Record) -> StorageResult<PageId> {
        Err(StorageError::MutationNotSupported {
            operation: "delete_record",
        })
    }
}

/// Fully resolve `path`. When the file does not exist yet, the deepest
/// existing ancestor is canonicalized and the missing tail re-attached, so the
/// result matches what `canonicalize` returns once the file is created.
pub(crate) fn resolve_path(path: &Path) -> StorageResult<PathBuf> {
    if let Ok(resolved) = std::fs::canonicalize(path) {
        return Ok(resolved);
    }

    let absolute = std::path::absolute(path)?;
    let mut tail = Vec::new();
    let mut ancestor = absolute.as_path();
    while let (Some(parent), Some(name)) = (ancestor.parent(), ancestor.file_name()) {
        tail.push(name);
        ancestor = parent;
        if let Ok(mut resolved) = std::fs::canonicalize(ancestor) {
            resolved.extend(tail.iter().rev().copied());
            return Ok(resolved);
        }
    }
    Ok(absolute)
}

/// Identity of a file: XxHash64 (seed 0) of its resolved path, low 32 bits.
/// Distinct paths may collide.
pub fn file_id_for_path(path: &Path) -> FileId {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(path.as_os_str().as_encoded_bytes());
    FileId(hasher.finish() as u32)
}
