use crate::domain::ports::BalanceCache;
use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// A cache whose every call fails, as if its server were down.
pub(crate) struct UnreachableCache;

#[async_trait]
impl BalanceCache for UnreachableCache {
    async fn get(&self, _key: &str) -> Result<Option<String>> {
        Err(std::io::Error::other("connection refused").into())
    }
    async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> Result<()> {
        Err(std::io::Error::other("connection refused").into())
    }
    async fn delete(&self, _key: &str) -> Result<()> {
        Err(std::io::Error::other("connection refused").into())
    }
}
