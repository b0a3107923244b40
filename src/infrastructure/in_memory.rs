use super::locks::{LoanGuard, LoanLocks};
use crate::domain::loan::{Loan, NewLoan};
use crate::domain::ports::{BalanceCache, LedgerStore, PaymentUnit, PaymentUnitBox};
use crate::domain::repayment::Repayment;
use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    loans: HashMap<u64, Loan>,
    repayments: HashMap<u64, Vec<Repayment>>,
    last_loan_id: u64,
    last_repayment_id: u64,
}

/// A thread-safe in-memory ledger store.
///
/// Committed rows live behind one `RwLock`, so every multi-row write is applied
/// under a single write guard and readers never observe half of it. Payment
/// units serialize per loan through [`LoanLocks`].
#[derive(Clone, Default)]
pub struct InMemoryLedgerStore {
    tables: Arc<RwLock<Tables>>,
    locks: LoanLocks,
}

impl InMemoryLedgerStore {
    /// Creates a new, empty store with the default lock timeout.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lock_timeout(timeout: Duration) -> Self {
        Self {
            tables: Arc::default(),
            locks: LoanLocks::new(timeout),
        }
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn create_loan(&self, loan: NewLoan, weeks: u32) -> Result<Loan> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();

        let loan_id = tables.last_loan_id + 1;
        let first_repayment_id = tables.last_repayment_id + 1;
        let schedule: Vec<Repayment> = (1..=weeks)
            .map(|week| {
                Repayment::unpaid(first_repayment_id + u64::from(week - 1), loan_id, week, now)
            })
            .collect();

        let loan = loan.into_loan(loan_id, now);
        tables.last_loan_id = loan_id;
        tables.last_repayment_id += u64::from(weeks);
        tables.loans.insert(loan_id, loan.clone());
        tables.repayments.insert(loan_id, schedule);
        Ok(loan)
    }

    async fn get_loan(&self, loan_id: u64) -> Result<Option<Loan>> {
        let tables = self.tables.read().await;
        Ok(tables.loans.get(&loan_id).cloned())
    }

    async fn repayments(&self, loan_id: u64) -> Result<Vec<Repayment>> {
        let tables = self.tables.read().await;
        Ok(tables.repayments.get(&loan_id).cloned().unwrap_or_default())
    }

    async fn begin_payment(&self, loan_id: u64) -> Result<PaymentUnitBox> {
        // Unknown ids never get a lock entry.
        if self.get_loan(loan_id).await?.is_none() {
            return Err(LedgerError::NotFound(loan_id));
        }

        let guard = self.locks.acquire(loan_id).await?;
        let loan = self
            .get_loan(loan_id)
            .await?
            .ok_or(LedgerError::NotFound(loan_id))?;

        Ok(Box::new(InMemoryPaymentUnit {
            tables: self.tables.clone(),
            loan,
            loan_dirty: false,
            staged: Vec::new(),
            _guard: guard,
        }))
    }
}

struct InMemoryPaymentUnit {
    tables: Arc<RwLock<Tables>>,
    loan: Loan,
    loan_dirty: bool,
    staged: Vec<Repayment>,
    _guard: LoanGuard,
}

impl InMemoryPaymentUnit {
    fn staged(&self, id: u64) -> Option<&Repayment> {
        self.staged.iter().find(|r| r.id == id)
    }
}

#[async_trait]
impl PaymentUnit for InMemoryPaymentUnit {
    fn loan(&self) -> &Loan {
        &self.loan
    }

    async fn next_pending(&mut self) -> Result<Option<Repayment>> {
        let tables = self.tables.read().await;
        let schedule = tables
            .repayments
            .get(&self.loan.id)
            .map(Vec::as_slice)
            .unwrap_or_default();

        Ok(schedule
            .iter()
            .map(|r| self.staged(r.id).unwrap_or(r))
            .filter(|r| !r.paid)
            .min_by_key(|r| r.week_no)
            .cloned())
    }

    async fn save_repayment(&mut self, repayment: Repayment) -> Result<()> {
        if repayment.loan_id != self.loan.id {
            return Err(LedgerError::TransactionFailed(format!(
                "repayment {} does not belong to loan {}",
                repayment.id, self.loan.id
            )));
        }
        self.staged.retain(|r| r.id != repayment.id);
        self.staged.push(repayment);
        Ok(())
    }

    async fn save_loan(&mut self, loan: Loan) -> Result<()> {
        if loan.id != self.loan.id {
            return Err(LedgerError::TransactionFailed(format!(
                "unit of work is scoped to loan {}, not {}",
                self.loan.id, loan.id
            )));
        }
        self.loan = loan;
        self.loan_dirty = true;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let mut tables = self.tables.write().await;

        // Validate everything before touching any row so a failed commit leaves
        // the tables as they were.
        let schedule = tables
            .repayments
            .get(&self.loan.id)
            .ok_or_else(|| {
                LedgerError::TransactionFailed(format!(
                    "schedule of loan {} not found",
                    self.loan.id
                ))
            })?;
        let mut positions = Vec::with_capacity(self.staged.len());
        for repayment in &self.staged {
            let pos = schedule
                .iter()
                .position(|r| r.id == repayment.id)
                .ok_or_else(|| {
                    LedgerError::TransactionFailed(format!(
                        "repayment {} not found",
                        repayment.id
                    ))
                })?;
            positions.push(pos);
        }

        if let Some(schedule) = tables.repayments.get_mut(&self.loan.id) {
            for (pos, repayment) in positions.into_iter().zip(&self.staged) {
                schedule[pos] = repayment.clone();
            }
        }
        if self.loan_dirty {
            tables.loans.insert(self.loan.id, self.loan.clone());
        }
        Ok(())
    }
}

/// A thread-safe in-memory cache with per-entry expiry.
///
/// Expired entries are dropped lazily when read.
#[derive(Default, Clone)]
pub struct InMemoryBalanceCache {
    entries: Arc<RwLock<HashMap<String, (String, Instant)>>>,
}

impl InMemoryBalanceCache {
    /// Creates a new, empty cache.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BalanceCache for InMemoryBalanceCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return Ok(None),
                Some((value, expires_at)) if *expires_at > Instant::now() => {
                    return Ok(Some(value.clone()));
                }
                Some(_) => {}
            }
        }

        let mut entries = self.entries.write().await;
        if entries
            .get(key)
            .is_some_and(|(_, expires_at)| *expires_at <= Instant::now())
        {
            entries.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), (value, Instant::now() + ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.remove(key);
        Ok(())
    }
}
