use super::locks::{LoanGuard, LoanLocks};
use crate::domain::loan::{Loan, NewLoan};
use crate::domain::ports::{LedgerStore, PaymentUnit, PaymentUnitBox};
use crate::domain::repayment::Repayment;
use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use chrono::Utc;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, Direction, IteratorMode, Options, WriteBatch};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Column Family for loan rows, keyed by loan id.
pub const CF_LOANS: &str = "loans";
/// Column Family for repayment rows, keyed by loan id then week number.
pub const CF_REPAYMENTS: &str = "repayments";
/// Column Family for id sequences.
pub const CF_META: &str = "meta";

const LAST_LOAN_ID: &[u8] = b"last_loan_id";
const LAST_REPAYMENT_ID: &[u8] = b"last_repayment_id";

/// A persistent ledger store backed by RocksDB.
///
/// Multi-row writes (origination and payment commits) go through a single
/// `WriteBatch`, which RocksDB applies atomically. Repayment keys are the big
/// endian loan id followed by the big endian week number, so a forward scan
/// from the loan prefix yields the schedule in week order.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDbLedgerStore {
    db: Arc<DB>,
    locks: LoanLocks,
    sequence: Arc<Mutex<()>>,
}

impl RocksDbLedgerStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the required column families exist.
    pub fn open<P: AsRef<Path>>(path: P, lock_timeout: Duration) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = [CF_LOANS, CF_REPAYMENTS, CF_META]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        Ok(Self {
            db: Arc::new(db),
            locks: LoanLocks::new(lock_timeout),
            sequence: Arc::new(Mutex::new(())),
        })
    }
}

fn cf<'a>(db: &'a DB, name: &str) -> Result<&'a ColumnFamily> {
    db.cf_handle(name).ok_or_else(|| {
        LedgerError::InternalError(Box::new(std::io::Error::other(format!(
            "{} column family not found",
            name
        ))))
    })
}

fn repayment_key(loan_id: u64, week_no: u32) -> Vec<u8> {
    let mut key = loan_id.to_be_bytes().to_vec();
    key.extend_from_slice(&week_no.to_be_bytes());
    key
}

fn read_sequence(db: &DB, key: &[u8]) -> Result<u64> {
    match db.get_cf(cf(db, CF_META)?, key)? {
        Some(bytes) => {
            let raw: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
                LedgerError::InternalError(Box::new(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "corrupt id sequence",
                )))
            })?;
            Ok(u64::from_be_bytes(raw))
        }
        None => Ok(0),
    }
}

fn load_loan(db: &DB, loan_id: u64) -> Result<Option<Loan>> {
    match db.get_cf(cf(db, CF_LOANS)?, loan_id.to_be_bytes())? {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

fn load_schedule(db: &DB, loan_id: u64) -> Result<Vec<Repayment>> {
    let prefix = loan_id.to_be_bytes();
    let iter = db.iterator_cf(
        cf(db, CF_REPAYMENTS)?,
        IteratorMode::From(&prefix, Direction::Forward),
    );

    let mut schedule = Vec::new();
    for item in iter {
        let (key, value) = item?;
        if !key.starts_with(&prefix) {
            break;
        }
        schedule.push(serde_json::from_slice(&value)?);
    }
    Ok(schedule)
}

#[async_trait]
impl LedgerStore for RocksDbLedgerStore {
    async fn create_loan(&self, loan: NewLoan, weeks: u32) -> Result<Loan> {
        // Id allocation and the batch write must not interleave with another
        // origination.
        let _sequence = self.sequence.lock().await;
        let now = Utc::now();

        let loan_id = read_sequence(&self.db, LAST_LOAN_ID)? + 1;
        let last_repayment_id = read_sequence(&self.db, LAST_REPAYMENT_ID)?;
        let loan = loan.into_loan(loan_id, now);

        let mut batch = WriteBatch::default();
        batch.put_cf(
            cf(&self.db, CF_LOANS)?,
            loan_id.to_be_bytes(),
            serde_json::to_vec(&loan)?,
        );
        let repayments_cf = cf(&self.db, CF_REPAYMENTS)?;
        for week in 1..=weeks {
            let repayment =
                Repayment::unpaid(last_repayment_id + u64::from(week), loan_id, week, now);
            batch.put_cf(
                repayments_cf,
                repayment_key(loan_id, week),
                serde_json::to_vec(&repayment)?,
            );
        }
        let meta_cf = cf(&self.db, CF_META)?;
        batch.put_cf(meta_cf, LAST_LOAN_ID, loan_id.to_be_bytes());
        batch.put_cf(
            meta_cf,
            LAST_REPAYMENT_ID,
            (last_repayment_id + u64::from(weeks)).to_be_bytes(),
        );

        self.db.write(batch)?;
        Ok(loan)
    }

    async fn get_loan(&self, loan_id: u64) -> Result<Option<Loan>> {
        load_loan(&self.db, loan_id)
    }

    async fn repayments(&self, loan_id: u64) -> Result<Vec<Repayment>> {
        load_schedule(&self.db, loan_id)
    }

    async fn begin_payment(&self, loan_id: u64) -> Result<PaymentUnitBox> {
        if load_loan(&self.db, loan_id)?.is_none() {
            return Err(LedgerError::NotFound(loan_id));
        }

        let guard = self.locks.acquire(loan_id).await?;
        let loan = load_loan(&self.db, loan_id)?.ok_or(LedgerError::NotFound(loan_id))?;

        Ok(Box::new(RocksDbPaymentUnit {
            db: self.db.clone(),
            loan,
            loan_dirty: false,
            staged: Vec::new(),
            _guard: guard,
        }))
    }
}

struct RocksDbPaymentUnit {
    db: Arc<DB>,
    loan: Loan,
    loan_dirty: bool,
    staged: Vec<Repayment>,
    _guard: LoanGuard,
}

#[async_trait]
impl PaymentUnit for RocksDbPaymentUnit {
    fn loan(&self) -> &Loan {
        &self.loan
    }

    async fn next_pending(&mut self) -> Result<Option<Repayment>> {
        let schedule = load_schedule(&self.db, self.loan.id)?;
        Ok(schedule
            .into_iter()
            .map(|r| {
                self.staged
                    .iter()
                    .find(|s| s.week_no == r.week_no)
                    .cloned()
                    .unwrap_or(r)
            })
            .filter(|r| !r.paid)
            .min_by_key(|r| r.week_no))
    }

    async fn save_repayment(&mut self, repayment: Repayment) -> Result<()> {
        if repayment.loan_id != self.loan.id {
            return Err(LedgerError::TransactionFailed(format!(
                "repayment {} does not belong to loan {}",
                repayment.id, self.loan.id
            )));
        }
        self.staged.retain(|r| r.week_no != repayment.week_no);
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
        let mut batch = WriteBatch::default();
        let repayments_cf = cf(&self.db, CF_REPAYMENTS)?;
        for repayment in &self.staged {
            batch.put_cf(
                repayments_cf,
                repayment_key(repayment.loan_id, repayment.week_no),
                serde_json::to_vec(repayment)?,
            );
        }
        if self.loan_dirty {
            batch.put_cf(
                cf(&self.db, CF_LOANS)?,
                self.loan.id.to_be_bytes(),
                serde_json::to_vec(&self.loan)?,
            );
        }

        self.db
            .write(batch)
            .map_err(|e| LedgerError::TransactionFailed(e.to_string()))
    }
}
