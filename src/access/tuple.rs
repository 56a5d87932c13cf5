use crate::access::value::Value;
use crate::storage::page::PageId;
use std::cmp::Ordering;

/// Location of a record: the page holding it and its slot on that page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId {
    pub page_id: PageId,
    pub slot: u16,
}

impl RecordId {
    pub fn new(page_id: PageId, slot: u16) -> Self {
        Self { page_id, slot }
    }
}

impl PartialOrd for RecordId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RecordId {
    fn cmp(&self, other: &Self) -> Ordering {
        // First compare by page, then by slot
        match self.page_id.cmp(&other.page_id) {
            Ordering::Equal => self.slot.cmp(&other.slot),
            other => other,
        }
    }
}

/// A single row of a heap file.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub record_id: RecordId,
    pub values: Vec<Value>,
}

impl Record {
    pub fn new(record_id: RecordId, values: Vec<Value>) -> Self {
        Self { record_id, values }
    }
}
