use crate::error::{LedgerError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Fixed interest applied to every loan, on top of the principal.
pub const INTEREST_RATE: Decimal = dec!(0.10);

/// Number of weekly installments in every repayment schedule.
pub const SCHEDULE_WEEKS: u32 = 50;

/// A strictly positive principal amount.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Principal(Decimal);

impl Principal {
    pub fn new(value: Decimal) -> Result<Self> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(LedgerError::InvalidInput(
                "Loan amount must be positive".to_string(),
            ))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

/// Terms of a loan that has been priced but not yet persisted.
///
/// The store assigns the identifier and creation timestamp when it turns this
/// into a [`Loan`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewLoan {
    pub borrower_id: u64,
    pub amount: Decimal,
    pub interest_rate: Decimal,
    pub weekly_payment: Decimal,
    pub remaining_balance: Decimal,
}

impl NewLoan {
    /// Prices a loan: total due is `principal * (1 + rate)`, spread evenly
    /// over [`SCHEDULE_WEEKS`] installments.
    ///
    /// Principals whose total due does not fit a `Decimal` are rejected with
    /// `InvalidInput`.
    pub fn price(borrower_id: u64, principal: Principal) -> Result<Self> {
        let amount = principal.value();
        let too_large = || LedgerError::InvalidInput("Loan amount too large".to_string());
        let total_due = amount
            .checked_mul(Decimal::ONE + INTEREST_RATE)
            .ok_or_else(too_large)?;
        let weekly_payment = total_due
            .checked_div(Decimal::from(SCHEDULE_WEEKS))
            .ok_or_else(too_large)?;
        Ok(Self {
            borrower_id,
            amount,
            interest_rate: INTEREST_RATE,
            weekly_payment,
            remaining_balance: total_due,
        })
    }

    pub fn into_loan(self, id: u64, created_at: DateTime<Utc>) -> Loan {
        Loan {
            id,
            borrower_id: self.borrower_id,
            amount: self.amount,
            interest_rate: self.interest_rate,
            weekly_payment: self.weekly_payment,
            remaining_balance: self.remaining_balance,
            created_at,
        }
    }
}

/// A persisted loan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub id: u64,
    pub borrower_id: u64,
    pub amount: Decimal,
    pub interest_rate: Decimal,
    pub weekly_payment: Decimal,
    pub remaining_balance: Decimal,
    pub created_at: DateTime<Utc>,
}

impl Loan {
    /// Applies one weekly installment to the remaining balance.
    ///
    /// The final installment retires whatever is left so that rounding in the
    /// weekly amount never leaves a residue, and the balance never drops
    /// below zero.
    pub fn apply_installment(&mut self, final_installment: bool) {
        if final_installment || self.remaining_balance <= self.weekly_payment {
            self.remaining_balance = Decimal::ZERO;
        } else {
            self.remaining_balance -= self.weekly_payment;
        }
    }
}
