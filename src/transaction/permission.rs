use crate::concurrency::lock::LockMode;
use serde::{Deserialize, Serialize};

/// Intent declared when requesting a page from the buffer pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    ReadOnly,
    ReadWrite,
}

impl Permission {
    /// The page lock a request with this permission must hold.
    pub fn lock_mode(&self) -> LockMode {
        match self {
            Permission::ReadOnly => LockMode::Shared,
            Permission::ReadWrite => LockMode::Exclusive,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_modes() {
        assert_eq!(Permission::ReadOnly.lock_mode(), LockMode::Shared);
        assert_eq!(Permission::ReadWrite.lock_mode(), LockMode::Exclusive);
    }
}
