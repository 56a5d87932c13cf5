pub mod heap_page;

use std::fmt;

/// Identity of a heap file, derived from its resolved path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileId(pub u32);

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "file#{}", self.0)
    }
}

/// Address of a page: the file it lives in and its zero-based number there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PageId {
    pub file_id: FileId,
    pub page_no: u32,
}

impl PageId {
    pub fn new(file_id: FileId, page_no: u32) -> Self {
        Self { file_id, page_no }
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/page#{}", self.file_id, self.page_no)
    }
}

pub trait Page {
    fn page_id(&self) -> PageId;
    fn to_bytes(&self) -> Vec<u8>;
}

pub use heap_page::{HeapPage, HeapPageRecords};
