use super::cache::{decode_balance, decode_flag, encode_balance, encode_flag, CacheKey, DEFAULT_CACHE_TTL};
use crate::domain::ports::{BalanceCacheRef, LedgerStoreRef};
use crate::domain::repayment;
use crate::error::{LedgerError, Result};
use rust_decimal::Decimal;
use std::time::Duration;
use tracing::{debug, warn};

/// Read path for balances and delinquency.
///
/// Both queries are read-through: a live cache entry is returned as is, and a
/// miss is answered from the store and written back with the configured TTL.
/// A cached value may trail a payment that is committing concurrently.
pub struct StatusQueryService {
    store: LedgerStoreRef,
    cache: BalanceCacheRef,
    cache_ttl: Duration,
}

impl StatusQueryService {
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

    pub async fn get_outstanding(&self, loan_id: u64) -> Result<Decimal> {
        let key = CacheKey::Outstanding(loan_id).to_string();
        if let Some(balance) = self.cached(&key).await.and_then(|raw| decode_balance(&raw)) {
            debug!(%key, "cache hit");
            return Ok(balance);
        }
        debug!(%key, "cache miss");

        let loan = self
            .store
            .get_loan(loan_id)
            .await?
            .ok_or(LedgerError::NotFound(loan_id))?;

        self.populate(&key, encode_balance(loan.remaining_balance)).await;
        Ok(loan.remaining_balance)
    }

    pub async fn is_delinquent(&self, loan_id: u64) -> Result<bool> {
        let key = CacheKey::Delinquent(loan_id).to_string();
        if let Some(flag) = self.cached(&key).await.and_then(|raw| decode_flag(&raw)) {
            debug!(%key, "cache hit");
            return Ok(flag);
        }
        debug!(%key, "cache miss");

        if self.store.get_loan(loan_id).await?.is_none() {
            return Err(LedgerError::NotFound(loan_id));
        }
        let schedule = self.store.repayments(loan_id).await?;
        let delinquent = repayment::is_delinquent(&schedule);

        self.populate(&key, encode_flag(delinquent)).await;
        Ok(delinquent)
    }

    /// Cache errors degrade to a miss.
    async fn cached(&self, key: &str) -> Option<String> {
        match self.cache.get(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!(%key, error = %e, "cache read failed, falling back to store");
                None
            }
        }
    }

    async fn populate(&self, key: &str, value: String) {
        if let Err(e) = self.cache.set(key, value, self.cache_ttl).await {
            warn!(%key, error = %e, "failed to populate cache");
        }
    }
}
