use super::loan::{Loan, NewLoan};
use super::repayment::Repayment;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Durable storage for loans and their repayment schedules.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Persists a loan together with its `weeks` unpaid repayment slots as one
    /// atomic write. Either all rows become visible or none do.
    async fn create_loan(&self, loan: NewLoan, weeks: u32) -> Result<Loan>;

    /// Reads the committed state of a loan without taking its lock.
    async fn get_loan(&self, loan_id: u64) -> Result<Option<Loan>>;

    /// Committed repayment slots of a loan, ordered by week ascending.
    async fn repayments(&self, loan_id: u64) -> Result<Vec<Repayment>>;

    /// Opens a payment unit of work holding the loan's exclusive lock.
    ///
    /// Fails with `NotFound` when the loan does not exist and with
    /// `TransactionFailed` when the lock cannot be taken in time.
    async fn begin_payment(&self, loan_id: u64) -> Result<PaymentUnitBox>;
}

/// A unit of work scoped to one locked loan.
///
/// Writes are staged and only become visible on [`PaymentUnit::commit`].
/// Dropping the unit without committing discards them; the loan lock is
/// released on drop either way.
#[async_trait]
pub trait PaymentUnit: Send {
    /// The loan as read under the lock, including staged changes.
    fn loan(&self) -> &Loan;

    /// The unpaid slot with the smallest week number, staged writes included.
    async fn next_pending(&mut self) -> Result<Option<Repayment>>;

    async fn save_repayment(&mut self, repayment: Repayment) -> Result<()>;

    async fn save_loan(&mut self, loan: Loan) -> Result<()>;

    async fn commit(self: Box<Self>) -> Result<()>;
}

/// Key/value store with expiring entries.
#[async_trait]
pub trait BalanceCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<()>;
}

pub type LedgerStoreRef = Arc<dyn LedgerStore>;
pub type PaymentUnitBox = Box<dyn PaymentUnit>;
pub type BalanceCacheRef = Arc<dyn BalanceCache>;
