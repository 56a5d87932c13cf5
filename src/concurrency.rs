//! Concurrency control.
//!
//! Page-level shared/exclusive locks taken by the buffer pool on behalf of
//! transactions, with wait-for graph deadlock detection.

pub mod lock;

pub use lock::{LockManager, LockMode};
