//! Tunables for heap files and the buffer pool.

use crate::storage::error::{StorageError, StorageResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_PAGE_SIZE: usize = 4096;
pub const DEFAULT_BUFFER_POOL_PAGES: usize = 50;
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 1000;

/// Largest page whose slot numbers still fit in a `u16`.
pub const MAX_PAGE_SIZE: usize = 1 << 16;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeapConfig {
    /// Size in bytes of every page in a heap file.
    pub page_size: usize,
    /// Maximum number of pages the buffer pool keeps in memory.
    pub buffer_pool_pages: usize,
    /// How long a page fetch waits for a lock. `None` waits forever.
    pub lock_timeout_ms: Option<u64>,
}

impl Default for HeapConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            buffer_pool_pages: DEFAULT_BUFFER_POOL_PAGES,
            lock_timeout_ms: Some(DEFAULT_LOCK_TIMEOUT_MS),
        }
    }
}

impl HeapConfig {
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_buffer_pool_pages(mut self, pages: usize) -> Self {
        self.buffer_pool_pages = pages;
        self
    }

    pub fn with_lock_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.lock_timeout_ms = timeout.map(|t| t.as_millis() as u64);
        self
    }

    pub fn lock_timeout(&self) -> Option<Duration> {
        self.lock_timeout_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> StorageResult<()> {
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(StorageError::InvalidConfig(format!(
                "page_size must be in 1..={MAX_PAGE_SIZE}, got {}",
                self.page_size
            )));
        }
        if self.buffer_pool_pages == 0 {
            return Err(StorageError::InvalidConfig(
                "buffer_pool_pages must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Load a configuration from a JSON file. Missing fields keep their defaults.
    pub fn from_json_file(path: &Path) -> StorageResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: HeapConfig = serde_json::from_str(&text)
            .map_err(|e| StorageError::InvalidConfig(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_are_valid() {
        let config = HeapConfig::default();
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.lock_timeout(), Some(Duration::from_millis(1000)));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(HeapConfig::default().with_page_size(0).validate().is_err());
        assert!(HeapConfig::default()
            .with_page_size(MAX_PAGE_SIZE + 1)
            .validate()
            .is_err());
        assert!(matches!(
            HeapConfig::default().with_buffer_pool_pages(0).validate(),
            Err(StorageError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_from_json_file_fills_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("heapdb.json");
        std::fs::write(&path, r#"{ "page_size": 1024, "lock_timeout_ms": null }"#)?;

        let config = HeapConfig::from_json_file(&path)?;
        assert_eq!(config.page_size, 1024);
        assert_eq!(config.buffer_pool_pages, DEFAULT_BUFFER_POOL_PAGES);
        assert_eq!(config.lock_timeout(), None);
        Ok(())
    }

    #[test]
    fn test_from_json_file_rejects_garbage() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "page_size = 12")?;
        assert!(HeapConfig::from_json_file(&path).is_err());

        let missing = dir.path().join("missing.json");
        assert!(matches!(
            HeapConfig::from_json_file(&missing),
            Err(StorageError::Io { .. })
        ));
        Ok(())
    }
}
