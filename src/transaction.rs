//! Transaction identity.
//!
//! The storage layer never interprets transactions itself: a
//! [`TransactionId`] is only the key under which the buffer pool takes and
//! releases page locks.

pub mod id;
pub mod permission;

pub use id::{TransactionId, TransactionIdGenerator};
pub use permission::Permission;
