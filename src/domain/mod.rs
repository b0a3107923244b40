//! Domain layer: loan and repayment entities plus the ports through which the
//! application reaches the ledger store and the balance cache.

pub mod loan;
pub mod ports;
pub mod repayment;
