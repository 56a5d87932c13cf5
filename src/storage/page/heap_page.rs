use crate::access::tuple::{Record, RecordId};
use crate::access::value::{deserialize_values, serialize_values, DataType, Value};
use crate::catalog::schema::Schema;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::{Page, PageId};
use std::sync::Arc;

// Page layout:
//   [ slot bitmap: ceil(slot_count / 8) bytes ][ slot 0 ][ slot 1 ] ... [ zero padding ]
// Bit i (LSB first within each byte) is set when slot i holds a record.

/// A decoded heap page holding fixed-width records.
#[derive(Debug, Clone)]
pub struct HeapPage {
    page_id: PageId,
    schema: Arc<Schema>,
    types: Vec<DataType>,
    page_size: usize,
    slots: Vec<Option<Vec<Value>>>,
}

impl HeapPage {
    /// Number of record slots that fit on a page.
    pub fn slot_count_for(page_size: usize, record_size: usize) -> usize {
        (page_size * 8) / (record_size * 8 + 1)
    }

    /// Size in bytes of the slot bitmap.
    pub fn header_len_for(slot_count: usize) -> usize {
        slot_count.div_ceil(8)
    }

    /// Create a page with every slot free.
    pub fn empty(page_id: PageId, schema: Arc<Schema>, page_size: usize) -> Self {
        let slot_count = Self::slot_count_for(page_size, schema.record_size());
        let types = schema.types();
        Self {
            page_id,
            schema,
            types,
            page_size,
            slots: vec![None; slot_count],
        }
    }

    /// Parse a raw page buffer, which must be exactly `page_size` bytes long.
    pub fn decode(
        page_id: PageId,
        schema: Arc<Schema>,
        page_size: usize,
        data: &[u8],
    ) -> StorageResult<Self> {
        if data.len() != page_size {
            return Err(StorageError::CorruptPage {
                page_id,
                reason: format!("expected {page_size} bytes, got {}", data.len()),
            });
        }

        let mut page = Self::empty(page_id, schema, page_size);
        let record_size = page.schema.record_size();
        let header_len = Self::header_len_for(page.slots.len());

        for slot in 0..page.slots.len() {
            if data[slot / 8] & (1 << (slot % 8)) == 0 {
                continue;
            }

            let start = header_len + slot * record_size;
            let bytes = &data[start..start + record_size];
            let values =
                deserialize_values(bytes, &page.types).map_err(|e| StorageError::CorruptPage {
                    page_id,
                    reason: format!("slot {slot}: {e}"),
                })?;
            page.slots[slot] = Some(values);
        }

        Ok(page)
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn used_slots(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn free_slots(&self) -> usize {
        self.slot_count() - self.used_slots()
    }

    pub fn is_slot_used(&self, slot: u16) -> bool {
        matches!(self.slots.get(slot as usize), Some(Some(_)))
    }

    /// The record stored in `slot`, if any.
    pub fn record(&self, slot: u16) -> Option<Record> {
        self.slots
            .get(slot as usize)
            .and_then(Option::as_ref)
            .map(|values| Record::new(RecordId::new(self.page_id, slot), values.clone()))
    }

    /// Place a record in the first free slot and return that slot.
    pub fn insert_record(&mut self, values: Vec<Value>) -> StorageResult<u16> {
        // Validate before claiming a slot
        serialize_values(&values, &self.types)?;

        let slot = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(StorageError::PageFull {
                page_id: self.page_id,
            })?;
        self.slots[slot] = Some(values);

        Ok(slot as u16)
    }

    pub fn delete_record(&mut self, slot: u16) -> StorageResult<()> {
        match self.slots.get_mut(slot as usize) {
            Some(entry @ Some(_)) => {
                *entry = None;
                Ok(())
            }
            _ => Err(StorageError::InvalidSlot {
                page_id: self.page_id,
                slot,
            }),
        }
    }

    /// One pass over the page's records in slot order.
    pub fn records(self: &Arc<Self>) -> HeapPageRecords {
        HeapPageRecords {
            page: Arc::clone(self),
            next_slot: 0,
        }
    }
}

impl Page for HeapPage {
    fn page_id(&self) -> PageId {
        self.page_id
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut data = vec![0u8; self.page_size];
        let record_size = self.schema.record_size();
        let header_len = Self::header_len_for(self.slots.len());

        for (slot, values) in self.slots.iter().enumerate() {
            let Some(values) = values else { continue };
            let bytes = serialize_values(values, &self.types)
                .expect("slot values are validated on insert and decode");
            data[slot / 8] |= 1 << (slot % 8);
            let start = header_len + slot * record_size;
            data[start..start + record_size].copy_from_slice(&bytes);
        }

        data
    }
}

/// Iterator over the used slots of a page. Holds the page alive.
pub struct HeapPageRecords {
    page: Arc<HeapPage>,
    next_slot: usize,
}

impl HeapPageRecords {
    pub fn page_id(&self) -> PageId {
        self.page.page_id
    }
}

impl Iterator for HeapPageRecords {
    type Item = Record;

    fn next(&mut self) -> Option<Self::Item> {
        while self.next_slot < self.page.slots.len() {
            let slot = self.next_slot;
            self.next_slot += 1;
            if let Some(record) = self.page.record(slot as u16) {
                return Some(record);
            }
        }
        None
    }
}
