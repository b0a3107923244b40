use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Loan {0} not found")]
    NotFound(u64),
    #[error("Loan {0} has no pending repayments")]
    NoPendingRepayment(u64),
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),
    #[error("Internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        LedgerError::InternalError(Box::new(err))
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::InternalError(Box::new(err))
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for LedgerError {
    fn from(err: rocksdb::Error) -> Self {
        LedgerError::InternalError(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
