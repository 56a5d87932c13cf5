//! Record-oriented access to heap files.
//!
//! - **Record / RecordId**: a decoded row and the (page, slot) it lives in
//! - **Value / DataType**: typed column values with fixed-width encoding
//! - **HeapScan**: lazy scan that chains page record iterators across a file

pub mod scan;
pub mod tuple;
pub mod value;

pub use scan::{DbFileIterator, HeapScan};
pub use tuple::{Record, RecordId};
pub use value::{DataType, Value, ValueError, VARCHAR_LEN};
