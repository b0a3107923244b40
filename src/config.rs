use crate::domain::ports::LedgerStoreRef;
use crate::error::Result;
use crate::infrastructure::in_memory::InMemoryLedgerStore;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Loan repayment ledger service", long_about = None)]
pub struct Config {
    /// Address the HTTP server listens on.
    #[arg(long, env = "LEDGER_BIND", default_value = "0.0.0.0:8080")]
    pub bind: SocketAddr,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, env = "LEDGER_DB_PATH")]
    pub db_path: Option<PathBuf>,

    /// How long a payment waits for the loan lock before failing.
    #[arg(long, env = "LEDGER_LOCK_TIMEOUT_MS", default_value_t = 5000)]
    pub lock_timeout_ms: u64,

    /// Lifetime of cached balances and delinquency flags.
    #[arg(long, env = "LEDGER_CACHE_TTL_SECS", default_value_t = 600)]
    pub cache_ttl_secs: u64,
}

impl Config {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Opens the ledger store selected by `--db-path`.
    pub fn open_store(&self) -> Result<LedgerStoreRef> {
        match &self.db_path {
            #[cfg(feature = "storage-rocksdb")]
            Some(path) => {
                let store = crate::infrastructure::rocksdb::RocksDbLedgerStore::open(
                    path,
                    self.lock_timeout(),
                )?;
                Ok(Arc::new(store))
            }
            #[cfg(not(feature = "storage-rocksdb"))]
            Some(path) => {
                tracing::warn!(
                    path = %path.display(),
                    "persistent storage requested via --db-path, but the 'storage-rocksdb' feature is not enabled; falling back to in-memory storage"
                );
                Ok(Arc::new(InMemoryLedgerStore::with_lock_timeout(self.lock_timeout())))
            }
            None => Ok(Arc::new(InMemoryLedgerStore::with_lock_timeout(self.lock_timeout()))),
        }
    }
}
