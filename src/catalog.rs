//! Registry of the heap files attached to the database.

pub mod schema;

use crate::storage::disk::DbFile;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::FileId;
use log::debug;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

pub use schema::{Column, Schema};

struct TableEntry {
    name: String,
    file: Arc<dyn DbFile>,
}

#[derive(Default)]
struct CatalogInner {
    tables: HashMap<FileId, TableEntry>,
    names: HashMap<String, FileId>,
}

/// Maps file identities and table names to heap files.
#[derive(Default)]
pub struct Catalog {
    inner: RwLock<CatalogInner>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `file` under `name`. A table with the same name or the same
    /// file identity is replaced.
    pub fn add_table(&self, name: impl Into<String>, file: Arc<dyn DbFile>) -> FileId {
        let name = name.into();
        let file_id = file.file_id();
        let mut inner = self.inner.write();

        if let Some(old_id) = inner.names.remove(&name) {
            inner.tables.remove(&old_id);
        }
        if let Some(old) = inner.tables.remove(&file_id) {
            inner.names.remove(&old.name);
        }

        debug!("attached table {} as {}", name, file_id);
        inner.names.insert(name.clone(), file_id);
        inner.tables.insert(file_id, TableEntry { name, file });
        file_id
    }

    pub fn file(&self, file_id: FileId) -> StorageResult<Arc<dyn DbFile>> {
        self.inner
            .read()
            .tables
            .get(&file_id)
            .map(|entry| Arc::clone(&entry.file))
            .ok_or(StorageError::UnknownFile(file_id))
    }

    pub fn schema(&self, file_id: FileId) -> StorageResult<Arc<Schema>> {
        Ok(Arc::clone(self.file(file_id)?.schema()))
    }

    pub fn file_id_by_name(&self, name: &str) -> Option<FileId> {
        self.inner.read().names.get(name).copied()
    }

    pub fn table_name(&self, file_id: FileId) -> Option<String> {
        self.inner
            .read()
            .tables
            .get(&file_id)
            .map(|entry| entry.name.clone())
    }

    /// Identities of every attached table, sorted.
    pub fn table_ids(&self) -> Vec<FileId> {
        let mut ids: Vec<FileId> = self.inner.read().tables.keys().copied().collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::value::DataType;
    use crate::config::HeapConfig;
    use crate::storage::disk::HeapFile;
    use anyhow::Result;
    use tempfile::tempdir;

    fn heap_file(path: &std::path::Path) -> Result<Arc<dyn DbFile>> {
        let schema = Arc::new(Schema::from_types(&[DataType::Int32]));
        Ok(Arc::new(HeapFile::new(path, schema, &HeapConfig::default())?))
    }

    #[test]
    fn test_add_and_lookup() -> Result<()> {
        let dir = tempdir()?;
        let catalog = Catalog::new();
        let file = heap_file(&dir.path().join("users.dat"))?;

        let id = catalog.add_table("users", Arc::clone(&file));
        assert_eq!(id, file.file_id());
        assert_eq!(catalog.file_id_by_name("users"), Some(id));
        assert_eq!(catalog.table_name(id).as_deref(), Some("users"));
        assert_eq!(catalog.file(id)?.file_id(), id);
        assert_eq!(catalog.schema(id)?.types(), vec![DataType::Int32]);
        assert_eq!(catalog.table_ids(), vec![id]);
        Ok(())
    }

    #[test]
    fn test_unknown_file() {
        let catalog = Catalog::new();
        assert!(matches!(
            catalog.file(FileId(42)),
            Err(StorageError::UnknownFile(FileId(42)))
        ));
        assert_eq!(catalog.file_id_by_name("nope"), None);
    }

    #[test]
    fn test_replacing_tables() -> Result<()> {
        let dir = tempdir()?;
        let catalog = Catalog::new();
        let a = heap_file(&dir.path().join("a.dat"))?;
        let b = heap_file(&dir.path().join("b.dat"))?;

        let a_id = catalog.add_table("t", Arc::clone(&a));
        // same name, different file
        let b_id = catalog.add_table("t", Arc::clone(&b));
        assert_eq!(catalog.table_ids(), vec![b_id]);
        assert!(catalog.file(a_id).is_err());

        // same file, different name
        catalog.add_table("renamed", b);
        assert_eq!(catalog.file_id_by_name("t"), None);
        assert_eq!(catalog.file_id_by_name("renamed"), Some(b_id));
        Ok(())
    }
}
