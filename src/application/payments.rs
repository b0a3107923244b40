use super::cache::{encode_balance, CacheKey, DEFAULT_CACHE_TTL};
use crate::domain::ports::{BalanceCacheRef, LedgerStoreRef};
use crate::error::{LedgerError, Result};
use rust_decimal::Decimal;
use std::time::Duration;
use tracing::{error, info, warn};

/// Outcome of a successfully applied payment.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentReceipt {
    pub loan_id: u64,
    pub week_no: u32,
    pub remaining_balance: Decimal,
}

/// Applies weekly payments to loans.
///
/// Each call runs one unit of work under the loan's exclusive lock: the
/// lowest unpaid week is retired and the balance is reduced by one weekly
/// installment, or nothing changes at all. Payments on the same loan are
/// serialized by the lock; payments on different loans run in parallel.
///
/// Calls are not idempotent: every successful call consumes one repayment.
pub struct PaymentProcessor {
    store: LedgerStoreRef,
    cache: BalanceCacheRef,
    cache_ttl: Duration,
}

impl PaymentProcessor {
    pub fn new(store: LedgerStoreRef, cache: BalanceCacheRef) -> Self {
        Self::with_cache_ttl(store, cache, DEFAULT_CACHE_TTL)
    }

    pub fn with_cache_ttl(store: LedgerStoreRef, cache: BalanceCacheRef, cache_ttl: Duration) -> Self {
        Self {
            store,
            cache,
            cache_ttl,
        }
    }

    /// Applies one payment to `loan_id`.
    ///
    /// Errors:
    /// - `NotFound` when the loan does not exist.
    /// - `NoPendingRepayment` when every week is already paid.
    /// - `TransactionFailed` for anything else that went wrong inside the unit
    ///   of work; nothing was persisted.
    pub async fn apply_payment(&self, loan_id: u64) -> Result<PaymentReceipt> {
        let receipt = self.apply_in_unit(loan_id).await.map_err(|e| match e {
            LedgerError::NotFound(_) | LedgerError::NoPendingRepayment(_) => e,
            LedgerError::TransactionFailed(reason) => {
                error!(loan_id, %reason, "payment rolled back");
                LedgerError::TransactionFailed(reason)
            }
            other => {
                error!(loan_id, error = %other, "payment rolled back");
                LedgerError::TransactionFailed(other.to_string())
            }
        })?;

        info!(
            loan_id,
            week_no = receipt.week_no,
            remaining_balance = %receipt.remaining_balance,
            "payment applied"
        );
        self.refresh_cache(&receipt).await;
        Ok(receipt)
    }

    async fn apply_in_unit(&self, loan_id: u64) -> Result<PaymentReceipt> {
        // The unit holds the loan lock until it is committed or dropped.
        let mut unit = self.store.begin_payment(loan_id).await?;

        let mut repayment = unit
            .next_pending()
            .await?
            .ok_or(LedgerError::NoPendingRepayment(loan_id))?;
        let week_no = repayment.week_no;
        repayment.mark_paid()?;
        unit.save_repayment(repayment).await?;

        let final_installment = unit.next_pending().await?.is_none();
        let mut loan = unit.loan().clone();
        loan.apply_installment(final_installment);
        let remaining_balance = loan.remaining_balance;
        unit.save_loan(loan).await?;

        unit.commit().await?;

        Ok(PaymentReceipt {
            loan_id,
            week_no,
            remaining_balance,
        })
    }

    /// Pushes the committed balance into the cache and drops the delinquency
    /// flag so the next read recomputes it. Failures here only cost freshness.
    async fn refresh_cache(&self, receipt: &PaymentReceipt) {
        let key = CacheKey::Outstanding(receipt.loan_id).to_string();
        if let Err(e) = self
            .cache
            .set(&key, encode_balance(receipt.remaining_balance), self.cache_ttl)
            .await
        {
            warn!(%key, error = %e, "failed to update cached balance");
        }

        let key = CacheKey::Delinquent(receipt.loan_id).to_string();
        if let Err(e) = self.cache.delete(&key).await {
            warn!(%key, error = %e, "failed to invalidate cached delinquency");
        }
    }
}
