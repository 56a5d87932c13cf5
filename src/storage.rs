//! Storage layer.
//!
//! A heap file is a flat sequence of fixed-size pages on disk. Key components:
//!
//! - **HeapFile**: computes page offsets, reads and decodes single pages
//! - **HeapPage**: slot bitmap followed by fixed-width records
//! - **BufferPool**: bounded cache of decoded pages guarded by page locks
//!
//! Writing pages back is not supported; files are produced offline by the
//! encoder in [`disk::encoder`].

pub mod buffer;
pub mod disk;
pub mod error;
pub mod page;

pub use buffer::{BufferPool, PageCache};
pub use disk::{DbFile, DbFileMut, HeapFile};
pub use error::{StorageError, StorageResult};
pub use page::{FileId, HeapPage, Page, PageId};
