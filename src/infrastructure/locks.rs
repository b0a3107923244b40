use crate::error::{LedgerError, Result};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError};
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};

pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

type LockTable = Arc<std::sync::Mutex<HashMap<u64, Arc<Mutex<()>>>>>;

/// Per-loan exclusive locks shared by the store backends.
///
/// Locks on different loans are independent. Acquisition gives up after the
/// configured timeout. An entry only lives while some caller holds or waits
/// on it, so the table never grows past the number of loans in flight.
#[derive(Clone)]
pub struct LoanLocks {
    locks: LockTable,
    timeout: Duration,
}

impl Default for LoanLocks {
    fn default() -> Self {
        Self::new(DEFAULT_LOCK_TIMEOUT)
    }
}

impl LoanLocks {
    pub fn new(timeout: Duration) -> Self {
        Self {
            locks: Arc::default(),
            timeout,
        }
    }

    pub async fn acquire(&self, loan_id: u64) -> Result<LoanGuard> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.entry(loan_id).or_default().clone()
        };

        match tokio::time::timeout(self.timeout, lock.clone().lock_owned()).await {
            Ok(guard) => Ok(LoanGuard {
                guard: Some(guard),
                lock,
                loan_id,
                locks: self.locks.clone(),
            }),
            Err(_) => {
                release(&self.locks, loan_id, &lock);
                Err(LedgerError::TransactionFailed(format!(
                    "timed out after {:?} waiting for lock on loan {}",
                    self.timeout, loan_id
                )))
            }
        }
    }

    /// Number of loans that currently have a lock entry.
    pub fn tracked(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Exclusive hold on one loan. Dropping it unlocks the loan.
pub struct LoanGuard {
    guard: Option<OwnedMutexGuard<()>>,
    lock: Arc<Mutex<()>>,
    loan_id: u64,
    locks: LockTable,
}

impl Drop for LoanGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        release(&self.locks, self.loan_id, &self.lock);
    }
}

// Removes the entry when the table and `lock` hold the only references.
// Clones are only handed out under the table lock, so the count cannot grow
// while it is checked.
fn release(table: &LockTable, loan_id: u64, lock: &Arc<Mutex<()>>) {
    let mut locks = table.lock().unwrap_or_else(PoisonError::into_inner);
    let unused = locks
        .get(&loan_id)
        .is_some_and(|entry| Arc::ptr_eq(entry, lock) && Arc::strong_count(lock) == 2);
    if unused {
        locks.remove(&loan_id);
    }
}
