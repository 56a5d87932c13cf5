//! Page-level lock management.
//!
//! Requests on a page are queued in arrival order. A request is granted once
//! it is compatible with every granted lock held by other transactions and no
//! earlier request is still waiting. A transaction that is the only holder of
//! a shared lock may upgrade it to exclusive in place.

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::page::PageId;
use crate::transaction::TransactionId;
use log::debug;
use parking_lot::{Condvar, Mutex};
use std::collections::{HashMap, HashSet, VecDeque};
use std::time::{Duration, Instant};

/// Lock modes supported by the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockMode {
    /// Shared lock for read operations.
    Shared,
    /// Exclusive lock for write operations.
    Exclusive,
}

impl LockMode {
    /// Checks if this lock mode is compatible with another.
    pub fn is_compatible_with(&self, other: &LockMode) -> bool {
        matches!((self, other), (LockMode::Shared, LockMode::Shared))
    }

    /// Whether holding `self` already satisfies a request for `wanted`.
    fn covers(&self, wanted: LockMode) -> bool {
        *self == LockMode::Exclusive || wanted == LockMode::Shared
    }
}

#[derive(Debug, Clone)]
struct LockRequest {
    txn: TransactionId,
    mode: LockMode,
    granted: bool,
}

/// Wait-for graph: txn -> transactions it is waiting on.
#[derive(Debug, Default)]
struct DeadlockDetector {
    wait_for: HashMap<TransactionId, HashSet<TransactionId>>,
}

impl DeadlockDetector {
    fn set_waits(&mut self, waiter: TransactionId, holders: HashSet<TransactionId>) {
        self.wait_for.insert(waiter, holders);
    }

    fn clear_waits(&mut self, waiter: TransactionId) {
        self.wait_for.remove(&waiter);
    }

    fn remove_transaction(&mut self, txn: TransactionId) {
        self.wait_for.remove(&txn);
        for waits in self.wait_for.values_mut() {
            waits.remove(&txn);
        }
    }

    /// True if `holder` (transitively) waits on `waiter`.
    fn would_cause_deadlock(&self, waiter: TransactionId, holder: TransactionId) -> bool {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([holder]);

        while let Some(current) = queue.pop_front() {
            if current == waiter {
                return true;
            }
            if visited.insert(current) {
                if let Some(next) = self.wait_for.get(&current) {
                    queue.extend(next.iter().copied());
                }
            }
        }

        false
    }
}

#[derive(Debug, Default)]
struct LockTable {
    locks: HashMap<PageId, VecDeque<LockRequest>>,
    held: HashMap<TransactionId, HashSet<PageId>>,
    detector: DeadlockDetector,
}

impl LockTable {
    fn granted_mode(&self, txn: TransactionId, page_id: PageId) -> Option<LockMode> {
        self.locks
            .get(&page_id)?
            .iter()
            .find(|r| r.txn == txn && r.granted)
            .map(|r| r.mode)
    }

    /// Transactions standing between `txn` and a `mode` lock on `page_id`.
    fn blockers(
        &self,
        txn: TransactionId,
        page_id: PageId,
        mode: LockMode,
        upgrade: bool,
    ) -> HashSet<TransactionId> {
        let mut blockers = HashSet::new();
        let Some(requests) = self.locks.get(&page_id) else {
            return blockers;
        };

        let mut ahead_of_us = true;
        for request in requests {
            if request.txn == txn {
                ahead_of_us = false;
                continue;
            }
            let conflicts = request.granted && !request.mode.is_compatible_with(&mode);
            let queued_ahead = !upgrade && ahead_of_us && !request.granted;
            if conflicts || queued_ahead {
                blockers.insert(request.txn);
            }
        }

        blockers
    }

    fn grant(&mut self, txn: TransactionId, page_id: PageId, mode: LockMode) {
        if let Some(request) = self
            .locks
            .get_mut(&page_id)
            .and_then(|requests| requests.iter_mut().find(|r| r.txn == txn))
        {
            request.granted = true;
            request.mode = mode;
        }
        self.held.entry(txn).or_default().insert(page_id);
        self.detector.clear_waits(txn);
    }

    /// Drop a request that will not be granted (timeout or deadlock).
    fn abandon(&mut self, txn: TransactionId, page_id: PageId, upgrade: bool) {
        if !upgrade {
            self.remove_request(txn, page_id);
        }
        self.detector.clear_waits(txn);
    }

    fn remove_request(&mut self, txn: TransactionId, page_id: PageId) {
        if let Some(requests) = self.locks.get_mut(&page_id) {
            requests.retain(|r| r.txn != txn);
            if requests.is_empty() {
                self.locks.remove(&page_id);
            }
        }
    }
}

/// Page lock manager shared by every transaction using a buffer pool.
#[derive(Debug, Default)]
pub struct LockManager {
    table: Mutex<LockTable>,
    changed: Condvar,
}

impl LockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire a `mode` lock on `page_id` for `txn`, blocking until it is
    /// granted, `timeout` elapses, or waiting would deadlock.
    pub fn acquire_lock(
        &self,
        txn: TransactionId,
        page_id: PageId,
        mode: LockMode,
        timeout: Option<Duration>,
    ) -> StorageResult<()> {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut table = self.table.lock();

        let current = table.granted_mode(txn, page_id);
        if current.is_some_and(|held| held.covers(mode)) {
            return Ok(());
        }
        let upgrade = current.is_some();
        if !upgrade {
            table
                .locks
                .entry(page_id)
                .or_default()
                .push_back(LockRequest {
                    txn,
                    mode,
                    granted: false,
                });
        }

        loop {
            let blockers = table.blockers(txn, page_id, mode, upgrade);
            if blockers.is_empty() {
                table.grant(txn, page_id, mode);
                self.changed.notify_all();
                return Ok(());
            }

            if blockers
                .iter()
                .any(|holder| table.detector.would_cause_deadlock(txn, *holder))
            {
                debug!("{} would deadlock waiting for {}", txn, page_id);
                table.abandon(txn, page_id, upgrade);
                self.changed.notify_all();
                return Err(StorageError::Deadlock { txn, page_id });
            }
            table.detector.set_waits(txn, blockers);

            let timed_out = match deadline {
                Some(deadline) => self.changed.wait_until(&mut table, deadline).timed_out(),
                None => {
                    self.changed.wait(&mut table);
                    false
                }
            };

            if timed_out && !table.blockers(txn, page_id, mode, upgrade).is_empty() {
                debug!("{} timed out waiting for {}", txn, page_id);
                table.abandon(txn, page_id, upgrade);
                self.changed.notify_all();
                return Err(StorageError::LockTimeout { txn, page_id });
            }
        }
    }

    /// Release one lock. Returns false if `txn` held nothing on `page_id`.
    pub fn release_lock(&self, txn: TransactionId, page_id: PageId) -> bool {
        let mut table = self.table.lock();
        let held = table
            .held
            .get_mut(&txn)
            .is_some_and(|pages| pages.remove(&page_id));
        if table.held.get(&txn).is_some_and(HashSet::is_empty) {
            table.held.remove(&txn);
        }
        table.remove_request(txn, page_id);
        self.changed.notify_all();
        held
    }

    /// Release every lock held by a transaction.
    pub fn release_all_locks(&self, txn: TransactionId) {
        let mut table = self.table.lock();
        if let Some(pages) = table.held.remove(&txn) {
            for page_id in pages {
                table.remove_request(txn, page_id);
            }
        }
        table.detector.remove_transaction(txn);
        self.changed.notify_all();
    }

    /// Pages on which `txn` holds a lock, in page order.
    pub fn held_locks(&self, txn: TransactionId) -> Vec<PageId> {
        let table = self.table.lock();
        let mut pages: Vec<PageId> = table
            .held
            .get(&txn)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        pages.sort();
        pages
    }

    /// Whether `txn` holds a lock on `page_id` at least as strong as `mode`.
    pub fn holds_lock(&self, txn: TransactionId, page_id: PageId, mode: LockMode) -> bool {
        self.table
            .lock()
            .granted_mode(txn, page_id)
            .is_some_and(|held| held.covers(mode))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::page::FileId;
    use std::sync::Arc;
    use std::thread;

    const SHORT: Option<Duration> = Some(Duration::from_millis(50));

    fn pid(page_no: u32) -> PageId {
        PageId::new(FileId(9), page_no)
    }

    fn txn(id: u64) -> TransactionId {
        TransactionId::new(id)
    }

    #[test]
    fn test_lock_compatibility() {
        assert!(LockMode::Shared.is_compatible_with(&LockMode::Shared));
        assert!(!LockMode::Shared.is_compatible_with(&LockMode::Exclusive));
        assert!(!LockMode::Exclusive.is_compatible_with(&LockMode::Shared));
        assert!(!LockMode::Exclusive.is_compatible_with(&LockMode::Exclusive));
    }

    #[test]
    fn test_shared_locks_coexist() {
        let manager = LockManager::new();
        manager.acquire_lock(txn(1), pid(0), LockMode::Shared, SHORT).unwrap();
        manager.acquire_lock(txn(2), pid(0), LockMode::Shared, SHORT).unwrap();

        assert!(manager.holds_lock(txn(1), pid(0), LockMode::Shared));
        assert!(manager.holds_lock(txn(2), pid(0), LockMode::Shared));
        assert!(!manager.holds_lock(txn(1), pid(0), LockMode::Exclusive));
    }

    #[test]
    fn test_exclusive_blocks_until_timeout() {
        let manager = LockManager::new();
        manager.acquire_lock(txn(1), pid(0), LockMode::Exclusive, SHORT).unwrap();

        let result = manager.acquire_lock(txn(2), pid(0), LockMode::Shared, SHORT);
        assert!(matches!(result, Err(StorageError::LockTimeout { .. })));
        assert!(manager.held_locks(txn(2)).is_empty());

        // a timed out waiter leaves no trace behind
        manager.release_all_locks(txn(1));
        manager.acquire_lock(txn(3), pid(0), LockMode::Exclusive, SHORT).unwrap();
    }

    #[test]
    fn test_reacquire_is_idempotent() {
        let manager = LockManager::new();
        manager.acquire_lock(txn(1), pid(0), LockMode::Exclusive, SHORT).unwrap();
        manager.acquire_lock(txn(1), pid(0), LockMode::Exclusive, SHORT).unwrap();
        // exclusive implies shared
        manager.acquire_lock(txn(1), pid(0), LockMode::Shared, SHORT).unwrap();
        assert_eq!(manager.held_locks(txn(1)), vec![pid(0)]);
    }

    #[test]
    fn test_upgrade_when_sole_holder() {
        let manager = LockManager::new();
        manager.acquire_lock(txn(1), pid(0), LockMode::Shared, SHORT).unwrap();
        manager.acquire_lock(txn(1), pid(0), LockMode::Exclusive, SHORT).unwrap();
        assert!(manager.holds_lock(txn(1), pid(0), LockMode::Exclusive));
    }

    #[test]
    fn test_upgrade_blocked_by_other_reader() {
        let manager = LockManager::new();
        manager.acquire_lock(txn(1), pid(0), LockMode::Shared, SHORT).unwrap();
        manager.acquire_lock(txn(2), pid(0), LockMode::Shared, SHORT).unwrap();

        let result = manager.acquire_lock(txn(1), pid(0), LockMode::Exclusive, SHORT);
        assert!(matches!(result, Err(StorageError::LockTimeout { .. })));
        // the shared lock survives the failed upgrade
        assert!(manager.holds_lock(txn(1), pid(0), LockMode::Shared));
    }

    #[test]
    fn test_release_wakes_waiter() {
        let manager = Arc::new(LockManager::new());
        manager.acquire_lock(txn(1), pid(0), LockMode::Exclusive, None).unwrap();

        let waiter = {
            let manager = Arc::clone(&manager);
            thread::spawn(move || {
                manager.acquire_lock(txn(2), pid(0), LockMode::Exclusive, Some(Duration::from_secs(5)))
            })
        };

        thread::sleep(Duration::from_millis(50));
        assert!(manager.release_lock(txn(1), pid(0)));
        waiter.join().unwrap().unwrap();

        assert!(manager.holds_lock(txn(2), pid(0), LockMode::Exclusive));
        assert!(!manager.release_lock(txn(1), pid(0)));
    }

    #[test]
    fn test_deadlock_detected() {
        let manager = Arc::new(LockManager::new());
        manager.acquire_lock(txn(1), pid(0), LockMode::Exclusive, None).unwrap();
        manager.acquire_lock(txn(2), pid(1), LockMode::Exclusive, None).unwrap();

        // txn 1 waits for page 1, held by txn 2
        let waiter = {
            let manager = Arc::clone(&manager);
            thread::spawn(move || {
                manager.acquire_lock(txn(1), pid(1), LockMode::Exclusive, Some(Duration::from_secs(5)))
            })
        };
        thread::sleep(Duration::from_millis(100));

        // txn 2 asking for page 0 would close the cycle
        let result =
            manager.acquire_lock(txn(2), pid(0), LockMode::Exclusive, Some(Duration::from_secs(5)));
        assert!(matches!(result, Err(StorageError::Deadlock { .. })));

        manager.release_all_locks(txn(2));
        waiter.join().unwrap().unwrap();
        assert_eq!(manager.held_locks(txn(1)), vec![pid(0), pid(1)]);
    }

    #[test]
    fn test_release_all_locks() {
        let manager = LockManager::new();
        for page_no in [3, 1, 2] {
            manager.acquire_lock(txn(1), pid(page_no), LockMode::Shared, SHORT).unwrap();
        }
        assert_eq!(manager.held_locks(txn(1)), vec![pid(1), pid(2), pid(3)]);

        manager.release_all_locks(txn(1));
        assert!(manager.held_locks(txn(1)).is_empty());
        manager.acquire_lock(txn(2), pid(1), LockMode::Exclusive, SHORT).unwrap();
    }
}
