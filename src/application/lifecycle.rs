use crate::domain::loan::{Loan, NewLoan, Principal, SCHEDULE_WEEKS};
use crate::domain::ports::LedgerStoreRef;
use crate::error::Result;
use rust_decimal::Decimal;
use tracing::info;

/// Originates loans and materializes their repayment schedules.
pub struct LoanLifecycleManager {
    store: LedgerStoreRef,
}

impl LoanLifecycleManager {
    pub fn new(store: LedgerStoreRef) -> Self {
        Self { store }
    }

    /// Prices a loan at the fixed rate and persists it together with its
    /// full schedule of unpaid weekly repayments.
    ///
    /// A non-positive or overflowing principal is rejected with `InvalidInput` before any
    /// write. Nothing is cached for a new loan.
    pub async fn originate(&self, borrower_id: u64, principal: Decimal) -> Result<Loan> {
        let terms = NewLoan::price(borrower_id, Principal::new(principal)?)?;
        let loan = self.store.create_loan(terms, SCHEDULE_WEEKS).await?;

        info!(
            loan_id = loan.id,
            borrower_id,
            amount = %loan.amount,
            weekly_payment = %loan.weekly_payment,
            "loan originated"
        );
        Ok(loan)
    }
}
