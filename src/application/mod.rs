//! Application layer containing the ledger's use cases.
//!
//! Each component talks to the ledger store and the balance cache through the
//! ports in [`crate::domain::ports`]; none of them calls another.

pub mod cache;
pub mod lifecycle;
pub mod payments;
pub mod status;
#[cfg(test)]
pub(crate) mod test_support;

pub use lifecycle::LoanLifecycleManager;
pub use payments::{PaymentProcessor, PaymentReceipt};
pub use status::StatusQueryService;
