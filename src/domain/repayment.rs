use crate::error::{LedgerError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One weekly installment slot of a loan's schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repayment {
    pub id: u64,
    pub loan_id: u64,
    pub week_no: u32,
    pub paid: bool,
    pub created_at: DateTime<Utc>,
}

impl Repayment {
    pub fn unpaid(id: u64, loan_id: u64, week_no: u32, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            loan_id,
            week_no,
            paid: false,
            created_at,
        }
    }

    /// Flips the slot to paid. A slot is paid at most once.
    pub fn mark_paid(&mut self) -> Result<()> {
        if self.paid {
            return Err(LedgerError::TransactionFailed(format!(
                "week {} of loan {} is already paid",
                self.week_no, self.loan_id
            )));
        }
        self.paid = true;
        Ok(())
    }
}

/// Number of most-recent pending weeks inspected by the delinquency rule.
pub const DELINQUENCY_WINDOW: usize = 2;

/// Decides delinquency from a loan's schedule.
///
/// Looks at the two highest week numbers among the unpaid slots and reports
/// delinquent when both of them are unpaid, i.e. when at least two weeks are
/// still pending. A loan with a single outstanding week is never delinquent.
pub fn is_delinquent(schedule: &[Repayment]) -> bool {
    let mut pending: Vec<u32> = schedule
        .iter()
        .filter(|r| !r.paid)
        .map(|r| r.week_no)
        .collect();
    pending.sort_unstable_by(|a, b| b.cmp(a));
    pending.iter().take(DELINQUENCY_WINDOW).count() >= DELINQUENCY_WINDOW
}
