pub mod encoder;
pub mod heap_file;

pub use heap_file::{file_id_for_path, DbFile, DbFileMut, HeapFile};
