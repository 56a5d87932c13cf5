//! Storage layer error types.

use crate::access::value::ValueError;
use crate::storage::page::{FileId, PageId};
use crate::transaction::TransactionId;
use thiserror::Error;

/// Errors that can occur in the storage layer.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Invalid page address: {page_id} (file has {num_pages} pages)")]
    InvalidPageAddress { page_id: PageId, num_pages: u32 },

    #[error("IO error: {source}")]
    Io {
        page_id: Option<PageId>,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt page {page_id}: {reason}")]
    CorruptPage { page_id: PageId, reason: String },

    #[error("Page is full: {page_id}")]
    PageFull { page_id: PageId },

    #[error("Invalid slot {slot} on {page_id}")]
    InvalidSlot { page_id: PageId, slot: u16 },

    #[error("Invalid record: {0}")]
    InvalidRecord(#[from] ValueError),

    #[error("Iterator is not open")]
    IteratorNotOpen,

    #[error("{operation} is not supported by a read-only heap file")]
    MutationNotSupported { operation: &'static str },

    #[error("Unknown file: {0}")]
    UnknownFile(FileId),

    #[error("{txn} timed out waiting for a lock on {page_id}")]
    LockTimeout { txn: TransactionId, page_id: PageId },

    #[error("Deadlock detected: {txn} waiting for {page_id}")]
    Deadlock { txn: TransactionId, page_id: PageId },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<std::io::Error> for StorageError {
    fn from(source: std::io::Error) -> Self {
        StorageError::Io {
            page_id: None,
            source,
        }
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
