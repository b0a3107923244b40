#![allow(dead_code)]

use loan_ledger::application::{LoanLifecycleManager, PaymentProcessor, StatusQueryService};
use loan_ledger::domain::ports::LedgerStoreRef;
use loan_ledger::infrastructure::in_memory::{InMemoryBalanceCache, InMemoryLedgerStore};
use std::sync::Arc;
use std::time::Duration;

/// The three components wired over shared in-memory adapters.
pub struct Ledger {
    pub store: LedgerStoreRef,
    pub cache: Arc<InMemoryBalanceCache>,
    pub lifecycle: LoanLifecycleManager,
    pub payments: Arc<PaymentProcessor>,
    pub status: StatusQueryService,
}

pub fn ledger() -> Ledger {
    ledger_with_store(Arc::new(InMemoryLedgerStore::new()))
}

pub fn ledger_with_store(store: LedgerStoreRef) -> Ledger {
    ledger_with(store, Duration::from_secs(600))
}

pub fn ledger_with(store: LedgerStoreRef, cache_ttl: Duration) -> Ledger {
    let cache = Arc::new(InMemoryBalanceCache::new());
    Ledger {
        lifecycle: LoanLifecycleManager::new(store.clone()),
        payments: Arc::new(PaymentProcessor::with_cache_ttl(
            store.clone(),
            cache.clone(),
            cache_ttl,
        )),
        status: StatusQueryService::with_cache_ttl(store.clone(), cache.clone(), cache_ttl),
        store,
        cache,
    }
}
